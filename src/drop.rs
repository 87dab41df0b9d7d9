//! Scoped release of producers.

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crate::Producer;

/// Owns a [`Producer`] and calls [`Producer::close`] on it when dropped.
///
/// The guard is created before any thread is spawned, so the producer is closed exactly once no
/// matter whether feeding ends through exhaustion, a failure, a panic, or a failed spawn.
pub(crate) struct CloseOnDrop<P: Producer> {
    producer: P,
    label: Arc<str>,
}

impl<P: Producer> CloseOnDrop<P> {
    pub(crate) fn new(producer: P, label: Arc<str>) -> Self {
        Self { producer, label }
    }
}

impl<P: Producer> Drop for CloseOnDrop<P> {
    fn drop(&mut self) {
        let label = &self.label;
        match self.producer.close() {
            Ok(()) => log::trace!("pool '{label}': producer closed"),
            Err(e) => log::warn!("pool '{label}': failed to close producer: {e:?}"),
        }
    }
}

impl<P: Producer> Deref for CloseOnDrop<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.producer
    }
}

impl<P: Producer> DerefMut for CloseOnDrop<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.producer
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

    use super::*;
    use crate::test::Scripted;

    #[test]
    fn closes_once_on_drop() {
        let producer = Scripted::new(3);
        let calls = producer.calls();
        let mut guard = CloseOnDrop::new(producer, "guard".into());
        assert_eq!(guard.next(), Ok(Some(1)));
        drop(guard);
        assert_eq!(calls.closes(), 1);
        assert_eq!(calls.nexts(), 1);
    }

    #[test]
    fn closes_on_unwind() {
        let producer = Scripted::new(3);
        let calls = producer.calls();
        let guard = CloseOnDrop::new(producer, "unwind".into());
        catch_unwind(AssertUnwindSafe(move || {
            let _guard = guard;
            resume_unwind(Box::new("producer user panicked"));
        }))
        .unwrap_err();
        assert_eq!(calls.closes(), 1);
    }

    #[test]
    fn close_error_is_swallowed() {
        let producer = Scripted::new(1).fail_close();
        let calls = producer.calls();
        drop(CloseOnDrop::new(producer, "failing".into()));
        assert_eq!(calls.closes(), 1);
    }
}
