use std::{
    fmt, mem,
    panic::resume_unwind,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

/// The receiving end of a running [`Pool`][crate::Pool].
///
/// Yields one entry per processed job, in completion order (which is generally *not* the order in
/// which the jobs were produced), plus at most one trailing producer failure. Once every job has
/// been processed and all workers have exited, the stream ends.
///
/// This type enforces structured concurrency: When it's dropped, the pool is told to wind down and
/// its driver and worker threads are joined. If any of them has panicked, the panic will be
/// forwarded to the thread dropping the [`ResultStream`].
///
/// Dropping the stream early does not interrupt jobs already being processed, nor a blocking call
/// to [`Producer::next`][crate::Producer::next]; the drop will wait for those to return.
pub struct ResultStream<T> {
    rx: Receiver<T>,
    driver: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T> ResultStream<T> {
    pub(crate) fn new(
        rx: Receiver<T>,
        driver: JoinHandle<()>,
        workers: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            rx,
            driver: Some(driver),
            workers,
        }
    }

    /// Blocks until the next entry is available.
    ///
    /// Returns [`None`] once the pool has finished.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Returns an entry if one is ready, without blocking.
    ///
    /// [`TryRecvError::Disconnected`] means the pool has finished.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }

    /// Waits up to `timeout` for the next entry.
    ///
    /// [`RecvTimeoutError::Disconnected`] means the pool has finished.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Discards all remaining entries and waits for the pool to finish.
    ///
    /// Unlike dropping the stream, this lets the pool run to completion: every remaining job is
    /// drawn from the producer and processed.
    pub fn join(mut self) {
        for _ in &mut self {}
    }

    fn wait_for_exit(&mut self) {
        // The driver only returns once every worker is done, so join it first.
        let mut payload = None;
        for handle in self.driver.take().into_iter().chain(self.workers.drain(..)) {
            if let Err(pl) = handle.join() {
                payload = Some(pl);
            }
        }
        if let Some(payload) = payload {
            if !thread::panicking() {
                resume_unwind(payload);
            }
        }
    }
}

impl<T> Iterator for ResultStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.recv()
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        // Disconnect so that workers stop at their next send.
        drop(mem::replace(&mut self.rx, crossbeam_channel::never()));

        self.wait_for_exit();
    }
}

impl<T> fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream")
            .field("ready", &self.rx.len())
            .field("running", &self.driver.is_some())
            .field("workers", &self.workers.len())
            .finish()
    }
}
