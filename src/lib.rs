//! A bounded, thread-based worker pool that pulls jobs from a producer and streams results back.
//!
//! # Overview
//!
//! A [`Pool`] owns a fixed number of worker threads that all run the same [`Handler`]. When
//! [`Pool::run`] is called with a [`Producer`], a driver thread starts drawing jobs from it, one
//! at a time, and pushes them into a job queue that holds at most as many jobs as there are
//! workers. Each worker takes a job off the queue, runs the handler on it, and sends the outcome
//! to the [`ResultStream`] returned by [`Pool::run`].
//!
//! ## Backpressure
//!
//! The job queue is bounded, so when every worker is busy and the queue is full, the driver blocks
//! instead of drawing more jobs. A producer is therefore never polled much faster than the workers
//! can process what it yields.
//!
//! ## Failures
//!
//! A handler error (or panic) only affects the job it was processing: it is delivered as an `Err`
//! entry on the result stream, and the worker moves on to the next job. A producer error (or
//! panic) ends the intake of new jobs: it is delivered as one final `Err` entry, while jobs that
//! were already queued are still processed. In both cases, [`Producer::close`] is called exactly
//! once.
//!
//! ## Shutdown
//!
//! The [`ResultStream`] ends once the producer is done and every job drawn from it has produced an
//! entry. Entries arrive in completion order, not in the order the jobs were produced. Dropping the
//! stream before that makes the pool wind down early and joins all of its threads.
//!
//! # Usage
//!
//! ```
//! use jobpool::{from_iter, Pool};
//!
//! let pool = Pool::new(3, |n: u32| {
//!     if n == 5 {
//!         Err("boom")
//!     } else {
//!         Ok(n * 2)
//!     }
//! })
//! .unwrap();
//!
//! let mut values = Vec::new();
//! let mut failures = 0;
//! for result in pool.run(from_iter(1_u32..=10)).unwrap() {
//!     match result {
//!         Ok(value) => values.push(value),
//!         Err(_) => failures += 1,
//!     }
//! }
//!
//! values.sort();
//! assert_eq!(values, [2, 4, 6, 8, 12, 14, 16, 18, 20]);
//! assert_eq!(failures, 1);
//! ```
//!
//! Custom producers implement [`Producer`], and [`tagged`] turns a closure that only reports
//! success or failure into a handler whose entries carry their job:
//!
//! ```
//! use std::{convert::Infallible, thread, time::Duration};
//! use jobpool::{tagged, Pool, Producer};
//!
//! struct Countdown(u32);
//!
//! impl Producer for Countdown {
//!     type Job = u32;
//!     type Error = Infallible;
//!
//!     fn next(&mut self) -> Result<Option<u32>, Infallible> {
//!         if self.0 == 0 {
//!             return Ok(None);
//!         }
//!         self.0 -= 1;
//!         Ok(Some(self.0))
//!     }
//! }
//!
//! let pool = Pool::builder()
//!     .name("countdown")
//!     .workers(3)
//!     .build(tagged(|n: &u32| {
//!         thread::sleep(Duration::from_millis(10));
//!         if n % 4 == 0 { Err("multiple of four") } else { Ok(()) }
//!     }))
//!     .unwrap();
//!
//! for result in pool.run(Countdown(10)).unwrap() {
//!     match result {
//!         Ok(job) => println!("job {job} done"),
//!         Err(e) => println!("{e}"),
//!     }
//! }
//! ```

mod drop;
mod error;
mod handler;
mod pool;
mod producer;
mod stream;
#[cfg(test)]
mod test;

pub use crossbeam_channel::{RecvTimeoutError, TryRecvError};
pub use error::{JobError, JobResult, PoolError};
pub use handler::{tagged, Cause, Failed, Handler, Tagged};
pub use pool::{Pool, PoolBuilder, MAX_RESULT_CAPACITY, MAX_WORKERS};
pub use producer::{from_iter, from_results, Infallibly, Iter, Producer};
pub use stream::ResultStream;
