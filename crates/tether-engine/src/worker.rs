//! User-facing [`WorkerThread`] handle and its shutdown protocol.
//!
//! # Architecture
//!
//! ```text
//! Producer thread(s)          Owner thread                 Ticker thread
//!     |                           |                             |
//!     |--dispatch()/enqueue()---->| queue.pop_blocking()        |
//!     |   [WorkQueue: FIFO]       | item.execute()              |
//!     |                           | tick_handler.on_tick() <----| push(Tick) every interval
//!     |                           |                             |
//!     |--shutdown()-------------->| Shutdown popped             |
//!     |   push(Shutdown)          | active=false, unpark ------>| exits
//!     |   join()                  | join ticker                 |
//!     |                           | close_and_drain() (discard) |
//!     |<--DispatchExit------------| return                      |
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use tether_core::{DispatchError, Envelope, EnvelopeKind, TickHandler, WorkItem};
use tracing::{info, warn};

use crate::config::{CreateError, EngineConfig};
use crate::dispatch::{DispatchExit, DispatchLoop};
use crate::metrics::{DispatchCounters, DispatchMetrics};
use crate::queue::WorkQueue;

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`WorkerThread::shutdown`].
///
/// A shutdown that had nothing to stop (handle idle, or already shut down)
/// returns `ShutdownReport::default()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Wall-clock time from the shutdown request until the owner thread
    /// was joined.
    pub total_ms: u64,
    /// Whether the owner thread was joined and returned normally.
    pub owner_joined: bool,
    /// Work items discarded without executing while draining.
    pub work_discarded: u64,
    /// Tick envelopes discarded while draining.
    pub ticks_discarded: u64,
}

// ── Lifecycle ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Idle,
    Running,
    Stopping,
}

/// Handle bookkeeping. Never held while joining or while work executes,
/// so a work item may query the owner id during a concurrent shutdown.
struct Lifecycle {
    state: LifecycleState,
    owner: Option<JoinHandle<DispatchExit>>,
    owner_id: Option<ThreadId>,
    /// Parked here while idle; moved into the owner thread while running.
    tick_handler: Option<Box<dyn TickHandler>>,
}

// ── WorkerThread ─────────────────────────────────────────────────

/// A dedicated owner thread that executes work items one at a time in
/// arrival order and delivers periodic ticks to a [`TickHandler`].
///
/// The handle is constructed idle. [`create`](WorkerThread::create) spawns
/// the owner thread (which spawns its ticker); [`shutdown`](WorkerThread::shutdown)
/// enqueues a terminal envelope and joins. Every method takes `&self`, so
/// the handle is normally shared as `Arc<WorkerThread>` between producers.
/// Dropping the handle shuts the owner thread down.
pub struct WorkerThread {
    config: EngineConfig,
    queue: Arc<WorkQueue>,
    counters: Arc<DispatchCounters>,
    lifecycle: Mutex<Lifecycle>,
}

// Compile-time assertion: WorkerThread must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<WorkerThread>();
};

impl WorkerThread {
    /// Create an idle handle whose ticks are ignored.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_tick_handler(config, || {})
    }

    /// Create an idle handle that delivers every tick to `handler` on the
    /// owner thread.
    ///
    /// The handler is moved into the owner thread on `create` and handed
    /// back on `shutdown`, so it survives re-creation.
    pub fn with_tick_handler(config: EngineConfig, handler: impl TickHandler) -> Self {
        Self {
            config,
            queue: Arc::new(WorkQueue::new()),
            counters: Arc::new(DispatchCounters::default()),
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Idle,
                owner: None,
                owner_id: None,
                tick_handler: Some(Box::new(handler)),
            }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the owner thread. No-op if it is already running.
    ///
    /// On error the handle stays idle and no dispatch is possible.
    pub fn create(&self) -> Result<(), CreateError> {
        let mut lc = self.lifecycle();
        match lc.state {
            LifecycleState::Running => return Ok(()),
            LifecycleState::Stopping => return Err(CreateError::ShutdownInProgress),
            LifecycleState::Idle => {}
        }
        self.config.validate()?;

        let tick_handler = lc.tick_handler.take().ok_or(CreateError::TickHandlerLost)?;
        let dispatch = DispatchLoop::new(
            self.config.name.clone(),
            self.config.ticker_name(),
            self.config.tick_interval,
            Arc::clone(&self.queue),
            Arc::clone(&self.counters),
            tick_handler,
        );

        // Open before spawning so work enqueued right after `create`
        // returns is accepted.
        self.queue.open();
        let handle = match thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || dispatch.run())
        {
            Ok(handle) => handle,
            Err(source) => {
                let drained = self.queue.close_and_drain();
                drop(lc);
                drained.dispose();
                return Err(CreateError::Spawn {
                    name: self.config.name.clone(),
                    source,
                });
            }
        };

        lc.owner_id = Some(handle.thread().id());
        lc.owner = Some(handle);
        lc.state = LifecycleState::Running;
        info!(worker = %self.config.name, "owner thread created");
        Ok(())
    }

    /// Hand a boxed work item to the owner thread.
    ///
    /// Never blocks beyond the queue lock. If the owner thread is not
    /// running (never created, or already shut down) the item is dropped
    /// here, releasing its captured state, and
    /// [`DispatchError::NotRunning`] is returned.
    pub fn enqueue(&self, item: Box<dyn WorkItem>) -> Result<(), DispatchError> {
        self.queue
            .push(Envelope::Work(item))
            .map_err(|_rejected| DispatchError::NotRunning)
    }

    /// Hand a closure to the owner thread. See [`enqueue`](WorkerThread::enqueue).
    pub fn dispatch<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(f))
    }

    /// Run `f` on the owner thread and block until it returns.
    ///
    /// If the caller already is the owner thread, `f` runs inline instead
    /// of being queued behind the caller (which would never return).
    /// Returns [`DispatchError::Abandoned`] if the item was discarded by a
    /// shutdown, or panicked, before producing a value.
    pub fn call<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner_thread() {
            return Ok(f());
        }
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.dispatch(move || {
            // Best-effort reply: the caller may have given up.
            let _ = reply_tx.send(f());
        })?;
        reply_rx.recv().map_err(|_| DispatchError::Abandoned)
    }

    /// Enqueue `Shutdown`, wait for the owner thread to terminate, and
    /// release it.
    ///
    /// Work queued before the call is executed first; work that arrives
    /// after `Shutdown` but before the owner thread drains is discarded
    /// without executing. Returns an empty report if there was nothing to
    /// stop (including when another thread's shutdown is in progress).
    /// Fails with [`DispatchError::ShutdownFromOwner`] when called from a
    /// work item on the owner thread, which cannot join itself.
    pub fn shutdown(&self) -> Result<ShutdownReport, DispatchError> {
        let start = Instant::now();
        let owner = {
            let mut lc = self.lifecycle();
            if lc.state != LifecycleState::Running {
                return Ok(ShutdownReport::default());
            }
            if lc.owner_id == Some(Self::current_thread_id()) {
                return Err(DispatchError::ShutdownFromOwner);
            }
            lc.state = LifecycleState::Stopping;
            lc.owner.take()
        };

        // The queue only closes inside the owner thread's drain, which
        // needs this envelope, so the push is accepted while the thread
        // is alive.
        let _ = self.queue.push(Envelope::Shutdown);
        let joined = owner.map(JoinHandle::join);

        let mut leftover = None;
        let mut lc = self.lifecycle();
        let report = match joined {
            Some(Ok(exit)) => {
                lc.tick_handler = Some(exit.tick_handler);
                ShutdownReport {
                    total_ms: start.elapsed().as_millis() as u64,
                    owner_joined: true,
                    work_discarded: exit.work_discarded,
                    ticks_discarded: exit.ticks_discarded,
                }
            }
            Some(Err(_)) | None => {
                warn!(worker = %self.config.name, "owner thread did not exit cleanly; tick handler lost");
                let drained = self.queue.close_and_drain();
                let work = drained.count(EnvelopeKind::Work);
                let ticks = drained.count(EnvelopeKind::Tick);
                self.counters.record_discarded(work, ticks);
                leftover = Some(drained);
                ShutdownReport {
                    total_ms: start.elapsed().as_millis() as u64,
                    owner_joined: false,
                    work_discarded: work,
                    ticks_discarded: ticks,
                }
            }
        };
        lc.owner_id = None;
        lc.state = LifecycleState::Idle;
        drop(lc);
        // Work item destructors may call back into this handle.
        if let Some(drained) = leftover {
            self.counters.record_disposal_panics(drained.dispose());
        }

        info!(
            worker = %self.config.name,
            total_ms = report.total_ms,
            work_discarded = report.work_discarded,
            ticks_discarded = report.ticks_discarded,
            "owner thread shut down"
        );
        Ok(report)
    }

    /// Identity of the owner thread, or `None` while idle.
    pub fn owner_thread_id(&self) -> Option<ThreadId> {
        self.lifecycle().owner_id
    }

    /// Identity of the calling thread.
    pub fn current_thread_id() -> ThreadId {
        thread::current().id()
    }

    /// True if the caller is running on this handle's owner thread.
    pub fn is_owner_thread(&self) -> bool {
        self.owner_thread_id() == Some(Self::current_thread_id())
    }

    /// True between a successful `create` and the start of `shutdown`.
    pub fn is_running(&self) -> bool {
        self.lifecycle().state == LifecycleState::Running
    }

    /// Owner thread name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration this handle was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the cumulative dispatch counters.
    pub fn metrics(&self) -> DispatchMetrics {
        self.counters.snapshot()
    }

    /// Number of envelopes waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if self.is_owner_thread() {
            // Last handle dropped from inside a work item: the owner thread
            // cannot join itself, so let it drain and exit detached.
            let _ = self.queue.push(Envelope::Shutdown);
            return;
        }
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("name", &self.config.name)
            .field("running", &self.is_running())
            .field("queue_len", &self.queue_len())
            .finish()
    }
}
