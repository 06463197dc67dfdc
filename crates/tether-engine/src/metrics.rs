//! Dispatch counters for the owner thread.
//!
//! [`DispatchCounters`] are shared atomics updated by the dispatch loop and
//! read lock-free by any thread. [`DispatchMetrics`] is a plain snapshot of
//! them, returned by [`WorkerThread::metrics`](crate::WorkerThread::metrics).

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the dispatch counters.
///
/// All counters are cumulative over the lifetime of the
/// [`WorkerThread`](crate::WorkerThread), across re-creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchMetrics {
    /// Work items handed to execution (including ones that panicked).
    pub work_executed: u64,
    /// Tick envelopes delivered to the tick handler.
    pub ticks_processed: u64,
    /// Work items whose execution, or disposal while draining, panicked
    /// and was isolated.
    pub work_panics: u64,
    /// Tick handler invocations that panicked and were isolated.
    pub tick_panics: u64,
    /// Work items disposed without executing while draining on shutdown.
    pub work_discarded: u64,
    /// Tick envelopes disposed while draining on shutdown.
    pub ticks_discarded: u64,
}

/// Shared atomic counters behind [`DispatchMetrics`].
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    work_executed: AtomicU64,
    ticks_processed: AtomicU64,
    work_panics: AtomicU64,
    tick_panics: AtomicU64,
    work_discarded: AtomicU64,
    ticks_discarded: AtomicU64,
}

// Compile-time assertion: DispatchCounters must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<DispatchCounters>();
};

impl DispatchCounters {
    pub fn record_work(&self, panicked: bool) {
        self.work_executed.fetch_add(1, Ordering::Relaxed);
        if panicked {
            self.work_panics.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_tick(&self, panicked: bool) {
        self.ticks_processed.fetch_add(1, Ordering::Relaxed);
        if panicked {
            self.tick_panics.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_discarded(&self, work: u64, ticks: u64) {
        self.work_discarded.fetch_add(work, Ordering::Relaxed);
        self.ticks_discarded.fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn record_disposal_panics(&self, panicked: u64) {
        self.work_panics.fetch_add(panicked, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchMetrics {
        DispatchMetrics {
            work_executed: self.work_executed.load(Ordering::Relaxed),
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            work_panics: self.work_panics.load(Ordering::Relaxed),
            tick_panics: self.tick_panics.load(Ordering::Relaxed),
            work_discarded: self.work_discarded.load(Ordering::Relaxed),
            ticks_discarded: self.ticks_discarded.load(Ordering::Relaxed),
        }
    }
}
