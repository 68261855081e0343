use quanta::Instant;
use std::thread::{self, ThreadId};

use crate::heap;
use crate::report::{Measurement, MemorySnapshot};
use crate::Backend;

/// Measures bytes allocated between [`start`](Self::start) and [`stop`](Self::stop).
///
/// Every operation forces a full collection before reading, so numbers are
/// taken from a just-collected state. That makes each call comparatively
/// expensive: the probe is meant for before/after snapshots, not sampling.
///
/// None of the operations fail. When no allocation counter is available they
/// read 0.
///
/// ```rust
/// let mut probe = allocprobe::AllocationProbe::new();
/// probe.start();
/// let buf = vec![0u8; 4096];
/// let bytes = probe.stop();
/// # drop(buf);
/// # let _ = bytes;
/// ```
#[derive(Debug, Clone)]
pub struct AllocationProbe {
    baseline: Option<u64>,
    backend: Backend,
    start_thread: Option<ThreadId>,
}

impl Default for AllocationProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationProbe {
    /// Probe reading the process-wide detected backend.
    pub fn new() -> Self {
        Self::with_backend(Backend::current())
    }

    /// Probe reading `backend`, bypassing detection.
    pub fn with_backend(backend: Backend) -> Self {
        backend.prepare();
        Self {
            baseline: None,
            backend,
            start_thread: None,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Counter value recorded by the last `start`, `None` before the first
    /// `start` or when the counter could not be read.
    pub fn baseline(&self) -> Option<u64> {
        self.baseline
    }

    /// Record the current allocation count as the baseline.
    pub fn start(&mut self) {
        self.start_thread = Some(thread::current().id());
        heap::collect();
        self.baseline = self.backend.read();
    }

    /// Bytes allocated since the last `start`, never negative.
    ///
    /// Returns 0 when `start` was never called or either reading is unknown.
    /// The baseline is kept, so stopping again reports the total since the
    /// same `start`.
    pub fn stop(&mut self) -> u64 {
        heap::collect();
        let current = self.backend.read();

        let Some(baseline) = self.baseline else {
            return 0;
        };

        let same_thread = self.start_thread == Some(thread::current().id());
        if self.backend == Backend::PerThreadCounter && !same_thread {
            tracing::warn!(
                "probe stopped on a different thread than it started, per-thread counter can't compare them"
            );
            return 0;
        }

        current.map_or(0, |current| current.saturating_sub(baseline))
    }

    /// Bytes held by live allocations right after a full collection.
    pub fn heap_size(&self) -> u64 {
        heap::collect();
        heap::heap_size(self.backend).unwrap_or(0)
    }

    /// Cumulative bytes allocated as seen by the backend. Not a delta.
    pub fn total_allocated_bytes(&self) -> u64 {
        heap::collect();
        self.backend.read().unwrap_or(0)
    }

    /// Both totals after a single collection.
    pub fn snapshot(&self) -> MemorySnapshot {
        heap::collect();
        MemorySnapshot {
            backend: self.backend,
            total_allocated_bytes: self.backend.read().unwrap_or(0),
            heap_size_bytes: heap::heap_size(self.backend).unwrap_or(0),
        }
    }

    /// Runs `f` between `start` and `stop`.
    pub fn measure<F, R>(&mut self, f: F) -> (R, Measurement)
    where
        F: FnOnce() -> R,
    {
        self.start();
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed();
        let bytes = self.stop();

        let measurement = Measurement {
            bytes,
            elapsed_ns: elapsed.as_nanos() as u64,
            backend: self.backend,
        };
        (result, measurement)
    }
}
