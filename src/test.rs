//! Internal unit test utilities.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::Producer;

/// Call counters shared between a [`Scripted`] producer and the test that owns it.
#[derive(Debug, Default)]
pub struct Calls {
    nexts: AtomicUsize,
    closes: AtomicUsize,
}

impl Calls {
    pub fn nexts(&self) -> usize {
        self.nexts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Yields `1..=count`, optionally failing on a given call to `next` (1-based) or on `close`.
pub struct Scripted {
    count: u32,
    fail_at: Option<usize>,
    panic_at: Option<usize>,
    fail_close: bool,
    calls: Arc<Calls>,
}

impl Scripted {
    pub fn new(count: u32) -> Self {
        Self {
            count,
            fail_at: None,
            panic_at: None,
            fail_close: false,
            calls: Arc::default(),
        }
    }

    pub fn fail_at(self, call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..self
        }
    }

    pub fn panic_at(self, call: usize) -> Self {
        Self {
            panic_at: Some(call),
            ..self
        }
    }

    pub fn fail_close(self) -> Self {
        Self {
            fail_close: true,
            ..self
        }
    }

    pub fn calls(&self) -> Arc<Calls> {
        self.calls.clone()
    }
}

impl Producer for Scripted {
    type Job = u32;
    type Error = &'static str;

    fn next(&mut self) -> Result<Option<u32>, &'static str> {
        let call = self.calls.nexts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(call) {
            return Err("producer broke");
        }
        if self.panic_at == Some(call) {
            std::panic::resume_unwind(Box::new("producer exploded"));
        }
        if call as u32 > self.count {
            return Ok(None);
        }
        Ok(Some(call as u32))
    }

    fn close(&mut self) -> Result<(), &'static str> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err("close failed");
        }
        Ok(())
    }
}

/// Tracks how many handler invocations are running at once.
#[derive(Debug, Default)]
pub struct Occupancy {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    pub fn enter(&self) -> OccupancyGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        OccupancyGuard(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct OccupancyGuard<'a>(&'a Occupancy);

impl Drop for OccupancyGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}
