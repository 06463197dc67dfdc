//! The owner thread's body: a three-state dispatch loop.
//!
//! ```text
//!            Work / Tick
//!            ┌────────┐
//!            ▼        │
//!   ──▶  Running ─────┘ ──Shutdown──▶ Draining ──▶ Terminated
//!   (start ticker)                 (stop+join ticker,
//!                                   close queue, discard rest)
//! ```
//!
//! At most one envelope is processed at a time, on the owner thread, in
//! queue arrival order. A work item or tick handler that panics is caught
//! at the dispatch boundary and counted; the loop carries on with the next
//! envelope. Work that is still queued when `Shutdown` is reached is
//! dropped without being executed, which releases whatever it captured.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tether_core::{Envelope, EnvelopeKind, TickHandler, WorkItem};
use tracing::{debug, trace};

use crate::metrics::DispatchCounters;
use crate::queue::WorkQueue;
use crate::ticker::Ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Running,
    Draining,
    Terminated,
}

/// What the owner thread hands back to the joiner.
pub(crate) struct DispatchExit {
    /// The tick handler, recovered for a later re-create.
    pub tick_handler: Box<dyn TickHandler>,
    /// Work items discarded while draining.
    pub work_discarded: u64,
    /// Tick envelopes discarded while draining.
    pub ticks_discarded: u64,
}

/// State moved into the owner thread.
pub(crate) struct DispatchLoop {
    name: String,
    ticker_name: String,
    tick_interval: Option<Duration>,
    queue: Arc<WorkQueue>,
    counters: Arc<DispatchCounters>,
    tick_handler: Box<dyn TickHandler>,
    ticker: Option<Ticker>,
    work_discarded: u64,
    ticks_discarded: u64,
}

impl DispatchLoop {
    pub fn new(
        name: String,
        ticker_name: String,
        tick_interval: Option<Duration>,
        queue: Arc<WorkQueue>,
        counters: Arc<DispatchCounters>,
        tick_handler: Box<dyn TickHandler>,
    ) -> Self {
        Self {
            name,
            ticker_name,
            tick_interval,
            queue,
            counters,
            tick_handler,
            ticker: None,
            work_discarded: 0,
            ticks_discarded: 0,
        }
    }

    /// Run until a `Shutdown` envelope has been processed.
    pub fn run(mut self) -> DispatchExit {
        let _span = tracing::debug_span!("dispatch", worker = %self.name).entered();
        debug!("dispatch loop started");

        // Entry to Running.
        self.ticker = self.tick_interval.and_then(|interval| {
            Ticker::spawn(self.ticker_name.clone(), Arc::clone(&self.queue), interval)
        });

        let mut state = DispatchState::Running;
        loop {
            state = match state {
                DispatchState::Running => {
                    let envelope = self.queue.pop_blocking();
                    self.dispatch(envelope)
                }
                DispatchState::Draining => self.drain(),
                DispatchState::Terminated => break,
            };
        }

        debug!(
            work_discarded = self.work_discarded,
            ticks_discarded = self.ticks_discarded,
            "dispatch loop terminated"
        );
        DispatchExit {
            tick_handler: self.tick_handler,
            work_discarded: self.work_discarded,
            ticks_discarded: self.ticks_discarded,
        }
    }

    /// Process one envelope in the `Running` state.
    fn dispatch(&mut self, envelope: Envelope) -> DispatchState {
        trace!(kind = %envelope.kind(), "dispatch");
        match envelope {
            Envelope::Work(item) => {
                self.execute(item);
                DispatchState::Running
            }
            Envelope::Tick => {
                self.tick();
                DispatchState::Running
            }
            Envelope::Shutdown => DispatchState::Draining,
        }
    }

    fn execute(&mut self, item: Box<dyn WorkItem>) {
        let panicked = panic::catch_unwind(AssertUnwindSafe(move || item.execute())).is_err();
        if panicked {
            debug!("work item panicked; continuing with next envelope");
        }
        self.counters.record_work(panicked);
    }

    fn tick(&mut self) {
        let handler = &mut self.tick_handler;
        let panicked = panic::catch_unwind(AssertUnwindSafe(|| handler.on_tick())).is_err();
        if panicked {
            debug!("tick handler panicked; continuing with next envelope");
        }
        self.counters.record_tick(panicked);
    }

    /// `Draining`: stop the ticker, then discard everything still queued.
    fn drain(&mut self) -> DispatchState {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        // The Shutdown envelope itself was consumed by `dispatch`.
        let drained = self.queue.close_and_drain();
        self.work_discarded = drained.count(EnvelopeKind::Work);
        self.ticks_discarded = drained.count(EnvelopeKind::Tick);
        self.counters
            .record_discarded(self.work_discarded, self.ticks_discarded);
        let panicked = drained.dispose();
        if panicked > 0 {
            debug!(panicked, "discarded work items panicked on drop");
            self.counters.record_disposal_panics(panicked);
        }
        DispatchState::Terminated
    }
}
