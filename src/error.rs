use std::{any::Any, io};

use thiserror::Error;

/// Errors reported synchronously when configuring or starting a [`Pool`][crate::Pool].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was configured with zero workers.
    #[error("a pool needs at least one worker")]
    NoWorkers,

    /// More workers were requested than [`MAX_WORKERS`][crate::MAX_WORKERS].
    #[error("a pool can have at most {max} workers, {requested} were requested")]
    TooManyWorkers { requested: usize, max: usize },

    /// A result stream buffer larger than [`MAX_RESULT_CAPACITY`][crate::MAX_RESULT_CAPACITY] was
    /// requested.
    #[error("a result stream can buffer at most {max} entries, {requested} were requested")]
    ResultCapacityTooLarge { requested: usize, max: usize },

    /// The pool name contains a NUL byte, so it cannot be used for thread names.
    #[error("pool name {0:?} contains a NUL byte")]
    InvalidName(String),

    /// A worker or driver thread could not be spawned.
    #[error("failed to spawn pool thread: {0}")]
    Spawn(#[from] io::Error),
}

/// One entry of a [`ResultStream`][crate::ResultStream]: the handler's output, or what went wrong.
pub type JobResult<R, H, P> = Result<R, JobError<H, P>>;

/// Failure carried by a single entry of a [`ResultStream`][crate::ResultStream].
///
/// `H` is the handler's error type, `P` is the producer's.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError<H, P> {
    /// The handler returned an error for one job. The worker keeps going.
    #[error("job failed: {0}")]
    Handler(H),

    /// The producer failed. This is always the last entry the driver emits; no further jobs are
    /// drawn.
    #[error("producer failed: {0}")]
    Producer(P),

    /// The handler or the producer panicked. The payload message is kept if it was a string.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl<H, P> JobError<H, P> {
    /// Returns `true` if this entry terminated the intake of jobs.
    pub fn is_producer_failure(&self) -> bool {
        matches!(self, JobError::Producer(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        JobError::Panicked(panic_message(payload))
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
