//! Timer ticker: pushes a [`Envelope::Tick`] into the work queue once per
//! interval while its `active` flag is set.
//!
//! The ticker is started by the dispatch loop when the loop begins and
//! joined by the dispatch loop when it processes `Shutdown`. The flag is
//! the only stop channel: it is written once, by the dispatch loop, and
//! read by the ticker at every wake-up. The wait is a `park_timeout`
//! against a deadline rather than a plain sleep, so the dispatch loop can
//! `unpark` the ticker after clearing the flag and shutdown does not wait
//! out a full period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tether_core::Envelope;
use tracing::{debug, warn};

use crate::queue::WorkQueue;

/// State moved into the ticker thread.
pub(crate) struct TickerState {
    queue: Arc<WorkQueue>,
    active: Arc<AtomicBool>,
    interval: Duration,
}

impl TickerState {
    pub fn new(queue: Arc<WorkQueue>, active: Arc<AtomicBool>, interval: Duration) -> Self {
        Self {
            queue,
            active,
            interval,
        }
    }

    /// Ticker main loop. Runs until `active` is cleared or the queue stops
    /// accepting envelopes. Returns the number of ticks pushed.
    pub fn run(self) -> u64 {
        let mut pushed = 0u64;
        let mut deadline = self.next_deadline();
        while self.active.load(Ordering::Acquire) {
            let Some(due) = deadline else {
                // Unrepresentable deadline: never tick, wait for stop.
                thread::park();
                continue;
            };
            if let Some(remaining) = due.checked_duration_since(Instant::now()) {
                if !remaining.is_zero() {
                    // Woken early by unpark (shutdown) or spuriously:
                    // re-check the flag and the deadline.
                    thread::park_timeout(remaining);
                    continue;
                }
            }
            if self.queue.push(Envelope::Tick).is_err() {
                break;
            }
            pushed += 1;
            deadline = self.next_deadline();
        }
        pushed
    }

    fn next_deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.interval)
    }
}

/// A running ticker thread and its stop flag.
pub(crate) struct Ticker {
    active: Arc<AtomicBool>,
    handle: JoinHandle<u64>,
}

impl Ticker {
    /// Spawn a ticker thread. Returns `None` (after logging) if the thread
    /// cannot be spawned; the owner thread then runs without ticks.
    pub fn spawn(name: String, queue: Arc<WorkQueue>, interval: Duration) -> Option<Self> {
        let active = Arc::new(AtomicBool::new(true));
        let state = TickerState::new(queue, Arc::clone(&active), interval);
        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || state.run())
        {
            Ok(handle) => {
                debug!(ticker = %name, interval_ms = interval.as_millis() as u64, "ticker started");
                Some(Self { active, handle })
            }
            Err(e) => {
                warn!(ticker = %name, error = %e, "failed to spawn ticker; running without ticks");
                None
            }
        }
    }

    /// Clear the active flag, wake the ticker, and join it.
    ///
    /// Returns the number of ticks it pushed, or `None` if it panicked.
    pub fn stop(self) -> Option<u64> {
        self.active.store(false, Ordering::Release);
        self.handle.thread().unpark();
        let pushed = self.handle.join().ok();
        debug!(ticks_pushed = ?pushed, "ticker stopped");
        pushed
    }
}
