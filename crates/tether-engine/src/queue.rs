//! Mutex-guarded FIFO of envelopes with a wait/notify condition.
//!
//! [`WorkQueue`] is the only shared mutable state between producers, the
//! timer ticker, and the dispatch loop. Arrival order under the lock is
//! processing order: there is no priority reordering, which is what lets a
//! [`Envelope::Shutdown`] flush everything queued before it.
//!
//! The queue carries an `accepting` gate. The dispatch loop closes it while
//! draining on shutdown, after which pushes hand the envelope straight back
//! to the caller instead of storing it where nothing will consume it.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tether_core::{Envelope, EnvelopeKind};

struct QueueState {
    envelopes: VecDeque<Envelope>,
    accepting: bool,
}

/// Unbounded multi-producer, single-consumer envelope queue.
///
/// Any thread may [`push`](WorkQueue::push), including the consumer
/// itself. Only the dispatch loop calls
/// [`pop_blocking`](WorkQueue::pop_blocking).
pub struct WorkQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

// Compile-time assertion: WorkQueue must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<WorkQueue>();
};

/// Envelopes removed by [`WorkQueue::close_and_drain`], counted by kind.
///
/// The envelopes are dropped outside the queue lock, either by
/// [`dispose`](Drained::dispose) or when the `Drained` value is dropped.
#[derive(Debug, Default)]
pub struct Drained {
    envelopes: Vec<Envelope>,
}

impl Drained {
    /// Number of drained envelopes of the given kind.
    pub fn count(&self, kind: EnvelopeKind) -> u64 {
        self.envelopes.iter().filter(|e| e.kind() == kind).count() as u64
    }

    /// Total number of drained envelopes.
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// True if nothing was drained.
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Drop the envelopes one at a time, catching panics raised by a work
    /// item's `Drop`. Returns how many drops panicked.
    pub fn dispose(self) -> u64 {
        let mut panicked = 0;
        for envelope in self.envelopes {
            if panic::catch_unwind(AssertUnwindSafe(move || drop(envelope))).is_err() {
                panicked += 1;
            }
        }
        panicked
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    /// Create a closed, empty queue. Call [`open`](WorkQueue::open) before
    /// pushing.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                envelopes: VecDeque::new(),
                accepting: false,
            }),
            ready: Condvar::new(),
        }
    }

    // No user code runs under this lock, so the state behind a poisoned
    // lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start accepting envelopes.
    pub fn open(&self) {
        self.lock().accepting = true;
    }

    /// Whether pushes are currently accepted.
    pub fn is_open(&self) -> bool {
        self.lock().accepting
    }

    /// Append an envelope and wake the consumer.
    ///
    /// Returns the envelope back if the queue is closed.
    pub fn push(&self, envelope: Envelope) -> Result<(), Envelope> {
        let mut state = self.lock();
        if !state.accepting {
            return Err(envelope);
        }
        state.envelopes.push_back(envelope);
        self.ready.notify_one();
        Ok(())
    }

    /// Block until an envelope is available, then remove and return the
    /// head.
    ///
    /// Only the dispatch loop calls this.
    pub fn pop_blocking(&self) -> Envelope {
        let mut state = self.lock();
        loop {
            if let Some(envelope) = state.envelopes.pop_front() {
                return envelope;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove the head without blocking.
    pub fn try_pop(&self) -> Option<Envelope> {
        self.lock().envelopes.pop_front()
    }

    /// Stop accepting envelopes and remove everything still queued, under
    /// a single lock acquisition.
    ///
    /// Nothing is executed. The caller drops the returned [`Drained`]
    /// after the lock is released, so work items that enqueue from their
    /// `Drop` see a closed queue rather than a deadlock.
    pub fn close_and_drain(&self) -> Drained {
        let mut state = self.lock();
        state.accepting = false;
        Drained {
            envelopes: state.envelopes.drain(..).collect(),
        }
    }

    /// Number of queued envelopes.
    pub fn len(&self) -> usize {
        self.lock().envelopes.len()
    }

    /// True if no envelopes are queued.
    pub fn is_empty(&self) -> bool {
        self.lock().envelopes.is_empty()
    }
}
