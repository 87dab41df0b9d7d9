//! Sequential job sources.

use std::{convert::Infallible, fmt, iter::Fuse};

/// A sequential source of jobs for a [`Pool`][crate::Pool].
///
/// The pool's driver thread calls [`Producer::next`] repeatedly, never concurrently, until it
/// returns `Ok(None)` (exhaustion) or an error (a terminal failure). Either way, it then calls
/// [`Producer::close`] exactly once.
pub trait Producer: Send + 'static {
    type Job: Send + 'static;
    type Error: fmt::Debug + Send + 'static;

    /// Returns the next job, `Ok(None)` once there are no more jobs, or an error.
    ///
    /// This may block for as long as it needs to.
    fn next(&mut self) -> Result<Option<Self::Job>, Self::Error>;

    /// Releases resources held by the producer.
    ///
    /// Errors are logged and otherwise ignored.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A [`Producer`] that draws jobs from an iterator.
///
/// Created by [`from_iter`] and [`from_results`].
pub struct Iter<I> {
    iter: Fuse<I>,
}

impl<I> fmt::Debug for Iter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").finish_non_exhaustive()
    }
}

/// Creates a [`Producer`] that yields every item of `iter` and never fails.
pub fn from_iter<I>(iter: I) -> Iter<Infallibly<I::IntoIter>>
where
    I: IntoIterator,
{
    Iter {
        iter: Infallibly(iter.into_iter()).fuse(),
    }
}

/// Creates a [`Producer`] from an iterator of `Result`s.
///
/// The first `Err` item is reported as a producer failure, and nothing after it is drawn.
pub fn from_results<I, J, E>(iter: I) -> Iter<I::IntoIter>
where
    I: IntoIterator<Item = Result<J, E>>,
{
    Iter {
        iter: iter.into_iter().fuse(),
    }
}

impl<I, J, E> Producer for Iter<I>
where
    I: Iterator<Item = Result<J, E>> + Send + 'static,
    J: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    type Job = J;
    type Error = E;

    fn next(&mut self) -> Result<Option<J>, E> {
        self.iter.next().transpose()
    }
}

/// Iterator adapter that wraps every item in `Ok`. Used by [`from_iter`].
#[derive(Debug)]
pub struct Infallibly<I>(I);

impl<I: Iterator> Iterator for Infallibly<I> {
    type Item = Result<I::Item, Infallible>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_exhausts() {
        let mut p = from_iter([1, 2]);
        assert_eq!(p.next(), Ok(Some(1)));
        assert_eq!(p.next(), Ok(Some(2)));
        assert_eq!(p.next(), Ok(None));
        assert_eq!(p.next(), Ok(None));
        assert_eq!(p.close(), Ok(()));
    }

    #[test]
    fn results_fail() {
        let mut p = from_results([Ok(1), Err("broken"), Ok(3)]);
        assert_eq!(p.next(), Ok(Some(1)));
        assert_eq!(p.next(), Err("broken"));
    }
}
