//! Reusable work-item and tick-handler fixtures.
//!
//! - [`WorkProbe`]: records whether its work item ran, was discarded, or
//!   is still pending.
//! - [`ExecutionLog`]: records `(value, thread)` pairs in execution order.
//! - [`TickCounter`]: a tick handler that counts invocations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tether_core::TickHandler;

/// What became of a probed work item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fate {
    /// Still owned by someone (queued, or not yet handed over).
    Pending,
    /// Executed, then released.
    Executed,
    /// Released without executing.
    Discarded,
}

struct DisposeGuard(Arc<AtomicBool>);

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Tracks the fate of the work items it hands out.
///
/// ```
/// use tether_test_utils::{Fate, WorkProbe};
///
/// let probe = WorkProbe::new();
/// let item = probe.item();
/// assert_eq!(probe.fate(), Fate::Pending);
/// drop(item);
/// assert_eq!(probe.fate(), Fate::Discarded);
/// ```
#[derive(Clone, Debug, Default)]
pub struct WorkProbe {
    executed: Arc<AtomicBool>,
    disposed: Arc<AtomicBool>,
}

impl WorkProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// A work item that marks the probe executed when it runs.
    ///
    /// Hand out one item per probe.
    pub fn item(&self) -> impl FnOnce() + Send + 'static {
        self.item_with(|| {})
    }

    /// A work item that runs `f`, then marks the probe executed.
    pub fn item_with<F>(&self, f: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = DisposeGuard(Arc::clone(&self.disposed));
        let executed = Arc::clone(&self.executed);
        move || {
            f();
            executed.store(true, Ordering::SeqCst);
            drop(guard);
        }
    }

    pub fn executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn fate(&self) -> Fate {
        match (self.disposed(), self.executed()) {
            (false, _) => Fate::Pending,
            (true, true) => Fate::Executed,
            (true, false) => Fate::Discarded,
        }
    }
}

/// Records `(value, executing thread)` pairs in the order they happen.
///
/// Cloning shares the log, so clones can be moved into work items.
#[derive(Debug)]
pub struct ExecutionLog<T> {
    tx: Sender<(T, ThreadId)>,
    rx: Receiver<(T, ThreadId)>,
}

impl<T> Clone for ExecutionLog<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T: Send + 'static> Default for ExecutionLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ExecutionLog<T> {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Record `value` as happening now, on the calling thread.
    pub fn record(&self, value: T) {
        // The log owns a receiver, so the channel is never disconnected.
        let _ = self.tx.send((value, thread::current().id()));
    }

    /// A work item that records `value` when executed.
    pub fn item(&self, value: T) -> impl FnOnce() + Send + 'static {
        let log = self.clone();
        move || log.record(value)
    }

    /// Remove and return everything recorded so far, in order.
    pub fn drain(&self) -> Vec<(T, ThreadId)> {
        self.rx.try_iter().collect()
    }

    /// Remove and return the recorded values, in order.
    pub fn values(&self) -> Vec<T> {
        self.drain().into_iter().map(|(v, _)| v).collect()
    }

    /// Block until `n` more entries are available or `timeout` elapses.
    /// Returns the entries received (possibly fewer than `n`).
    pub fn wait_for(&self, n: usize, timeout: Duration) -> Vec<(T, ThreadId)> {
        let deadline = std::time::Instant::now() + timeout;
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            match self.rx.recv_deadline(deadline) {
                Ok(entry) => out.push(entry),
                Err(_) => break,
            }
        }
        out
    }
}

/// Tick handler fixture that counts invocations.
#[derive(Clone, Debug, Default)]
pub struct TickCounter {
    count: Arc<AtomicU64>,
}

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler to install on the engine; shares this counter.
    pub fn handler(&self) -> impl TickHandler {
        let count = Arc::clone(&self.count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` ticks were counted. Returns whether that
    /// happened within `timeout`.
    pub fn wait_for(&self, n: u64, timeout: Duration) -> bool {
        crate::wait_until(timeout, || self.count() >= n)
    }
}
