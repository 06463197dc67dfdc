//! Timer registry and timer handles.
//!
//! The registry holds weak references to timer slots, keyed by id in
//! insertion order. A processing pass snapshots the live slots, releases
//! the registry lock, then checks each slot's schedule and runs its
//! callback with only that callback's own lock held. Callbacks are
//! therefore free to start, stop, create or drop timers (including on the
//! registry currently being processed).

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tether_core::TickHandler;

use crate::error::TimerError;

/// Identifies a timer within its registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

type Callback = Box<dyn FnMut() + Send>;

#[derive(Debug, Default)]
struct Schedule {
    period: Option<Duration>,
    /// `Some` while armed.
    next_due: Option<Instant>,
}

impl Schedule {
    /// Consume the expiry if due at `now`, advancing the deadline by one
    /// period, or to `now + period` when whole periods were missed. A timer
    /// whose next deadline cannot be represented is disarmed.
    fn take_expiry(&mut self, now: Instant) -> bool {
        let (Some(due), Some(period)) = (self.next_due, self.period) else {
            return false;
        };
        if due > now {
            return false;
        }
        self.next_due = due
            .checked_add(period)
            .filter(|next| *next > now)
            .or_else(|| now.checked_add(period));
        true
    }
}

struct TimerSlot {
    id: TimerId,
    schedule: Mutex<Schedule>,
    callback: Mutex<Callback>,
}

impl TimerSlot {
    fn schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RegistryInner {
    timers: Mutex<IndexMap<TimerId, Weak<TimerSlot>>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    fn timers(&self) -> MutexGuard<'_, IndexMap<TimerId, Weak<TimerSlot>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── TimerRegistry ───────────────────────────────────────────────

/// A shared set of periodic timers.
///
/// Cloning is cheap and every clone refers to the same timers. The
/// registry only keeps weak references: a timer lives as long as its
/// [`Timer`] handle.
#[derive(Clone)]
pub struct TimerRegistry {
    inner: Arc<RegistryInner>,
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                timers: Mutex::new(IndexMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a new, stopped timer that runs `callback` on each expiry.
    ///
    /// The callback runs on whichever thread processes the registry; for
    /// a registry installed as an engine's tick handler that is the owner
    /// thread.
    pub fn timer<F>(&self, callback: F) -> Timer
    where
        F: FnMut() + Send + 'static,
    {
        let id = TimerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(TimerSlot {
            id,
            schedule: Mutex::new(Schedule::default()),
            callback: Mutex::new(Box::new(callback)),
        });
        self.inner.timers().insert(id, Arc::downgrade(&slot));
        Timer {
            slot,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Fire every timer that is due now. Returns how many fired.
    pub fn process_timers(&self) -> usize {
        self.process_at(Instant::now())
    }

    /// Fire every timer due at `now`. Returns how many fired.
    ///
    /// Each timer fires at most once per call, in registration order.
    /// Timers created by a callback during the pass are first considered
    /// on the next pass.
    pub fn process_at(&self, now: Instant) -> usize {
        let live = self.snapshot();
        let mut fired = 0;
        for slot in &live {
            if !slot.schedule().take_expiry(now) {
                continue;
            }
            if run_callback(slot) {
                fired += 1;
            }
        }
        fired
    }

    /// Number of live timers, running or stopped.
    pub fn len(&self) -> usize {
        self.inner
            .timers()
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Whether the registry holds no live timers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upgrade every live slot, pruning entries whose handle is gone.
    fn snapshot(&self) -> SmallVec<[Arc<TimerSlot>; 8]> {
        let mut timers = self.inner.timers();
        let before = timers.len();
        let mut live = SmallVec::new();
        timers.retain(|_, weak| match weak.upgrade() {
            Some(slot) => {
                live.push(slot);
                true
            }
            None => false,
        });
        let pruned = before - timers.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = timers.len(), "pruned dropped timers");
        }
        live
    }
}

/// Run one slot's callback, isolating panics. Returns whether it ran.
fn run_callback(slot: &TimerSlot) -> bool {
    let mut callback = match slot.callback.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        // Re-entrant pass from inside this timer's own callback.
        Err(TryLockError::WouldBlock) => return false,
    };
    if catch_unwind(AssertUnwindSafe(|| (*callback)())).is_err() {
        tracing::debug!(timer = %slot.id, "timer callback panicked");
    }
    true
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TickHandler for TimerRegistry {
    fn on_tick(&mut self) {
        self.process_timers();
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("timers", &self.len())
            .finish()
    }
}

// ── Timer ───────────────────────────────────────────────────────

/// Handle to a periodic timer. Dropping it removes the timer from its
/// registry.
pub struct Timer {
    slot: Arc<TimerSlot>,
    registry: Weak<RegistryInner>,
}

impl Timer {
    /// Arm the timer: first expiry one `period` from now, then every
    /// `period`. Re-arms with the new period if already running.
    pub fn start(&self, period: Duration) -> Result<(), TimerError> {
        self.start_at(period, Instant::now())
    }

    /// Arm the timer relative to `now`. Deterministic variant of
    /// [`start`](Timer::start) for use with [`TimerRegistry::process_at`].
    ///
    /// Fails with [`TimerError::PeriodTooLong`] if `now + period` is not a
    /// representable instant; the timer is left unchanged.
    pub fn start_at(&self, period: Duration, now: Instant) -> Result<(), TimerError> {
        if period.is_zero() {
            return Err(TimerError::ZeroPeriod);
        }
        let first = now
            .checked_add(period)
            .ok_or(TimerError::PeriodTooLong { period })?;
        let mut schedule = self.slot.schedule();
        schedule.period = Some(period);
        schedule.next_due = Some(first);
        Ok(())
    }

    /// Disarm the timer. The period is kept for [`period`](Timer::period).
    pub fn stop(&self) {
        self.slot.schedule().next_due = None;
    }

    /// Whether the timer is armed.
    pub fn is_running(&self) -> bool {
        self.slot.schedule().next_due.is_some()
    }

    /// The period last passed to `start`, if any.
    pub fn period(&self) -> Option<Duration> {
        self.slot.schedule().period
    }

    /// This timer's id within its registry.
    pub fn id(&self) -> TimerId {
        self.slot.id
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        // A pass may still hold the slot; make sure it does not fire.
        self.stop();
        if let Some(registry) = self.registry.upgrade() {
            registry.timers().shift_remove(&self.slot.id);
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schedule = self.slot.schedule();
        f.debug_struct("Timer")
            .field("id", &self.slot.id)
            .field("period", &schedule.period)
            .field("running", &schedule.next_due.is_some())
            .finish()
    }
}

// Compile-time assertions: handles cross threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TimerRegistry>();
    assert::<Timer>();
};
