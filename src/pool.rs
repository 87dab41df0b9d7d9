use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use crossbeam_utils::sync::WaitGroup;

use crate::{
    drop::CloseOnDrop, Handler, JobError, JobResult, PoolError, Producer, ResultStream,
};

/// The largest number of workers a [`Pool`] accepts.
pub const MAX_WORKERS: usize = 1 << 16;

/// The largest result stream buffer a [`Pool`] accepts.
pub const MAX_RESULT_CAPACITY: usize = 1 << 20;

/// A builder object that can be used to configure and create a [`Pool`].
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    name: Option<String>,
    workers: usize,
    result_capacity: usize,
}

impl PoolBuilder {
    /// Sets the base name of the pool's threads.
    ///
    /// Worker threads are named `{name}-worker-{i}`, the driver thread `{name}-driver`. The name
    /// must not contain NUL bytes.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the number of worker threads, which is also the capacity of the job queue.
    ///
    /// Must be at least 1 and at most [`MAX_WORKERS`]. Defaults to 1.
    #[inline]
    pub fn workers(self, workers: usize) -> Self {
        Self { workers, ..self }
    }

    /// Sets how many finished entries may wait in the result stream before workers block.
    ///
    /// By default, a capacity of 0 is used, which means that a worker hands its result directly to
    /// the consumer of the [`ResultStream`] and waits for it to be taken. At most
    /// [`MAX_RESULT_CAPACITY`].
    #[inline]
    pub fn result_capacity(self, capacity: usize) -> Self {
        Self {
            result_capacity: capacity,
            ..self
        }
    }

    /// Creates a [`Pool`] that runs `handler` on every job.
    ///
    /// Fails if the worker count or the name cannot be used to start the pool.
    pub fn build<H>(self, handler: H) -> Result<Pool<H>, PoolError> {
        if self.workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        if self.workers > MAX_WORKERS {
            return Err(PoolError::TooManyWorkers {
                requested: self.workers,
                max: MAX_WORKERS,
            });
        }
        if self.result_capacity > MAX_RESULT_CAPACITY {
            return Err(PoolError::ResultCapacityTooLarge {
                requested: self.result_capacity,
                max: MAX_RESULT_CAPACITY,
            });
        }
        if let Some(name) = &self.name {
            if name.contains('\0') {
                return Err(PoolError::InvalidName(name.clone()));
            }
        }
        Ok(Pool {
            name: self.name,
            workers: self.workers,
            result_capacity: self.result_capacity,
            handler: Arc::new(handler),
        })
    }
}

/// A fixed set of worker threads fed from a [`Producer`] through a bounded job queue.
///
/// The queue holds at most as many jobs as there are workers. When it is full, the pool stops
/// asking the producer for more until a worker frees a slot, so a fast producer is throttled to
/// the rate at which the workers process jobs.
///
/// A [`Pool`] is consumed by [`Pool::run`], so it runs exactly one producer.
pub struct Pool<H> {
    name: Option<String>,
    workers: usize,
    result_capacity: usize,
    handler: Arc<H>,
}

impl Pool<()> {
    /// Returns a builder that can be used to configure and create a [`Pool`].
    #[inline]
    pub fn builder() -> PoolBuilder {
        PoolBuilder {
            name: None,
            workers: 1,
            result_capacity: 0,
        }
    }
}

impl<H> Pool<H> {
    /// Creates an unnamed [`Pool`] with `max_workers` workers that runs `handler` on every job.
    ///
    /// Returns [`PoolError::NoWorkers`] if `max_workers` is 0 and [`PoolError::TooManyWorkers`] if
    /// it exceeds [`MAX_WORKERS`].
    pub fn new(max_workers: usize, handler: H) -> Result<Self, PoolError> {
        Pool::builder().workers(max_workers).build(handler)
    }

    /// Returns the number of worker threads this pool runs.
    pub fn max_workers(&self) -> usize {
        self.workers
    }

    /// Returns the base name of the pool's threads, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn label(&self) -> Arc<str> {
        self.name.as_deref().unwrap_or("<unnamed>").into()
    }

    fn thread(&self, role: fmt::Arguments<'_>) -> thread::Builder {
        let builder = thread::Builder::new();
        match &self.name {
            Some(name) => builder.name(format!("{name}-{role}")),
            None => builder,
        }
    }

    /// Starts processing the jobs of `producer`, returning a stream of their results.
    ///
    /// This spawns the worker threads plus a driver thread that pulls jobs from `producer`, and
    /// returns without waiting for any of them. Every job drawn from `producer` yields exactly one
    /// entry on the returned [`ResultStream`]. If `producer` fails or panics, one extra entry
    /// carrying that failure is emitted and no further jobs are drawn. Either way,
    /// [`Producer::close`] is called exactly once, as soon as feeding stops.
    ///
    /// The stream ends once the producer is done and every job it produced has been processed.
    ///
    /// Returns [`PoolError::Spawn`] if a thread could not be spawned. In that case any threads
    /// already started are shut down and joined, and `producer` is closed without being polled.
    pub fn run<P>(
        self,
        producer: P,
    ) -> Result<ResultStream<JobResult<H::Output, H::Error, P::Error>>, PoolError>
    where
        P: Producer,
        H: Handler<P::Job>,
    {
        let label = self.label();
        let producer = CloseOnDrop::new(producer, label.clone());
        let (job_tx, job_rx) = crossbeam_channel::bounded::<P::Job>(self.workers);
        let (result_tx, result_rx) = crossbeam_channel::bounded(self.result_capacity);
        let live = WaitGroup::new();

        let mut workers = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let worker = Worker {
                id,
                label: label.clone(),
                handler: self.handler.clone(),
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                _live: live.clone(),
            };
            match self.thread(format_args!("worker-{id}")).spawn(move || worker.run()) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    log::error!("pool '{label}': failed to spawn worker {id}: {e}");
                    // Closing the queue makes the spawned workers exit right away.
                    drop(job_tx);
                    join_all(&label, workers);
                    return Err(e.into());
                }
            }
        }
        drop(job_rx);

        let driver = Driver {
            label: label.clone(),
            producer,
            jobs: job_tx,
            results: result_tx,
            live,
        };
        match self.thread(format_args!("driver")).spawn(move || driver.run()) {
            Ok(handle) => {
                log::debug!("pool '{label}': running with {} workers", self.workers);
                Ok(ResultStream::new(result_rx, handle, workers))
            }
            Err(e) => {
                // The dropped closure closed the producer and the job queue.
                log::error!("pool '{label}': failed to spawn driver: {e}");
                join_all(&label, workers);
                Err(e.into())
            }
        }
    }
}

impl<H> fmt::Debug for Pool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .field("result_capacity", &self.result_capacity)
            .finish_non_exhaustive()
    }
}

fn join_all(label: &str, handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            log::error!("pool '{label}': worker panicked");
        }
    }
}

/// Pulls jobs off the queue until it is closed and drained.
struct Worker<J, H: Handler<J>, E> {
    id: usize,
    label: Arc<str>,
    handler: Arc<H>,
    jobs: Receiver<J>,
    results: Sender<JobResult<H::Output, H::Error, E>>,
    /// Released when the worker exits, even by unwinding.
    _live: WaitGroup,
}

impl<J, H: Handler<J>, E> Worker<J, H, E> {
    fn run(self) {
        let Self { id, label, handler, .. } = &self;
        log::trace!("pool '{label}': worker {id} starting");

        for job in &self.jobs {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler.process(job))) {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(JobError::Handler(e)),
                Err(payload) => Err(JobError::from_panic(payload)),
            };
            if self.results.send(outcome).is_err() {
                log::warn!("pool '{label}': result stream was dropped, worker {id} stopping");
                break;
            }
        }

        log::trace!("pool '{label}': worker {id} exiting");
    }
}

/// Feeds the job queue from the producer, then shuts the pool down.
struct Driver<P: Producer, R, E> {
    label: Arc<str>,
    producer: CloseOnDrop<P>,
    jobs: Sender<P::Job>,
    results: Sender<JobResult<R, E, P::Error>>,
    live: WaitGroup,
}

impl<P: Producer, R, E> Driver<P, R, E> {
    fn run(self) {
        let Self {
            label,
            mut producer,
            jobs,
            results,
            live,
        } = self;
        log::trace!("pool '{label}': driver starting");

        let mut fed = 0_usize;
        loop {
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| producer.next())) {
                Ok(Ok(Some(job))) => {
                    // Blocks while the queue is full.
                    if jobs.send(job).is_err() {
                        log::debug!("pool '{label}': all workers stopped, no longer feeding");
                        break;
                    }
                    fed += 1;
                    continue;
                }
                Ok(Ok(None)) => {
                    log::debug!("pool '{label}': producer exhausted after {fed} jobs");
                    break;
                }
                Ok(Err(e)) => {
                    log::debug!("pool '{label}': producer failed after {fed} jobs: {e:?}");
                    JobError::Producer(e)
                }
                Err(payload) => {
                    log::debug!("pool '{label}': producer panicked after {fed} jobs");
                    JobError::from_panic(payload)
                }
            };
            if results.send(Err(failure)).is_err() {
                log::warn!("pool '{label}': result stream was dropped, producer failure lost");
            }
            break;
        }

        drop(producer);
        drop(jobs);
        log::debug!("pool '{label}': job queue closed, waiting for workers");
        live.wait();
        drop(results);
        log::trace!("pool '{label}': driver exiting, result stream closed");
    }
}
