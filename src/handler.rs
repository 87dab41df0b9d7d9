//! The per-job computation run by pool workers.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::error::panic_message;

/// Turns one job into one result.
///
/// A single handler instance is shared by every worker of a [`Pool`][crate::Pool] and may run up
/// to `max_workers` times at once. The pool does not serialize calls, so any interior state must
/// be synchronized by the handler itself.
///
/// Closures of the form `Fn(J) -> Result<R, E>` implement this trait.
pub trait Handler<J>: Send + Sync + 'static {
    type Output: Send + 'static;
    type Error: Send + 'static;

    fn process(&self, job: J) -> Result<Self::Output, Self::Error>;
}

impl<J, R, E, F> Handler<J> for F
where
    F: Fn(J) -> Result<R, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    type Output = R;
    type Error = E;

    #[inline]
    fn process(&self, job: J) -> Result<R, E> {
        self(job)
    }
}

/// A [`Handler`] that hands the job back alongside its outcome.
///
/// Created by [`tagged`].
pub struct Tagged<F> {
    f: F,
}

impl<F> fmt::Debug for Tagged<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tagged").finish_non_exhaustive()
    }
}

impl<J, E, F> Handler<J> for Tagged<F>
where
    F: Fn(&J) -> Result<(), E> + Send + Sync + 'static,
    J: Send + 'static,
    E: Send + 'static,
{
    type Output = J;
    type Error = Failed<J, E>;

    fn process(&self, job: J) -> Result<J, Failed<J, E>> {
        // Catch panics here so the job stays attached to the entry.
        let error = match panic::catch_unwind(AssertUnwindSafe(|| (self.f)(&job))) {
            Ok(Ok(())) => return Ok(job),
            Ok(Err(e)) => Cause::Error(e),
            Err(payload) => Cause::Panicked(panic_message(payload)),
        };
        Err(Failed { job, error })
    }
}

/// Wraps a closure that only reports success or failure into a job-tagged [`Handler`].
///
/// Successful entries on the result stream carry the job itself, failed ones carry a [`Failed`]
/// holding both the job and the error, so every entry can be matched back to its job. This holds
/// for panics too: a panic in `f` becomes a [`Cause::Panicked`] failure of that job.
///
/// ```
/// use jobpool::{tagged, Cause, Handler};
///
/// let handler = tagged(|n: &u32| if *n == 5 { Err("boom") } else { Ok(()) });
/// assert_eq!(handler.process(4).unwrap(), 4);
/// let failed = handler.process(5).unwrap_err();
/// assert_eq!((failed.job, failed.error), (5, Cause::Error("boom")));
/// ```
pub fn tagged<J, E, F>(f: F) -> Tagged<F>
where
    F: Fn(&J) -> Result<(), E> + Send + Sync + 'static,
{
    Tagged { f }
}

/// A failed job together with what went wrong while handling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed<J, E> {
    pub job: J,
    pub error: Cause<E>,
}

/// Why a [`tagged`] handler failed on a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause<E> {
    /// The closure returned an error.
    Error(E),
    /// The closure panicked. The payload message is kept if it was a string.
    Panicked(String),
}

impl<E: fmt::Display> fmt::Display for Cause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Error(e) => fmt::Display::fmt(e, f),
            Cause::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

impl<J: fmt::Debug, E: fmt::Display> fmt::Display for Failed<J, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (job {:?})", self.error, self.job)
    }
}

impl<J: fmt::Debug, E: std::error::Error + 'static> std::error::Error for Failed<J, E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.error {
            Cause::Error(e) => Some(e),
            Cause::Panicked(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn assert_handler<J, H: Handler<J>>(_: &H) {}

    #[test]
    fn closures_are_handlers() {
        let double = |n: u32| Ok::<_, String>(n * 2);
        assert_handler::<u32, _>(&double);
        assert_eq!(double.process(21), Ok(42));
    }

    #[test]
    fn stateful_handler() {
        struct Counter(AtomicUsize);

        impl Handler<()> for Counter {
            type Output = usize;
            type Error = ();

            fn process(&self, (): ()) -> Result<usize, ()> {
                Ok(self.0.fetch_add(1, Ordering::Relaxed))
            }
        }

        let counter = Counter(AtomicUsize::new(0));
        assert_eq!(counter.process(()), Ok(0));
        assert_eq!(counter.process(()), Ok(1));
    }

    #[test]
    fn tagged_keeps_job() {
        let handler = tagged(|s: &String| {
            if s.is_empty() {
                Err("empty")
            } else {
                Ok(())
            }
        });
        assert_eq!(handler.process("a".to_string()), Ok("a".to_string()));
        let failed = handler.process(String::new()).unwrap_err();
        assert_eq!(failed.job, "");
        assert_eq!(failed.to_string(), "empty (job \"\")");
    }

    #[test]
    fn tagged_panic_keeps_job() {
        let handler = tagged(|n: &u32| {
            if *n == 2 {
                panic::resume_unwind(Box::new("tagged exploded"));
            }
            Ok::<_, ()>(())
        });
        assert_eq!(handler.process(1), Ok(1));
        let failed = handler.process(2).unwrap_err();
        assert_eq!(failed.job, 2);
        assert_eq!(failed.error, Cause::Panicked("tagged exploded".into()));
    }
}
