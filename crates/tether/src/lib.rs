//! Tether: run work items and periodic timers on one dedicated owner thread.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Tether sub-crates. For most users, adding `tether` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use tether::prelude::*;
//!
//! let timers = TimerRegistry::new();
//! let worker = WorkerThread::with_tick_handler(EngineConfig::named("ui"), timers.clone());
//! worker.create().unwrap();
//!
//! // Runs on the "ui" thread; the caller blocks for the result.
//! let on_owner = worker.call(|| std::thread::current().name().map(str::to_owned)).unwrap();
//! assert_eq!(on_owner.as_deref(), Some("ui"));
//!
//! // Fire-and-forget.
//! worker.dispatch(|| println!("hello from the owner thread")).unwrap();
//!
//! // Periodic timers fire on the owner thread, driven by its ticker.
//! let heartbeat = timers.timer(|| {});
//! heartbeat.start(Duration::from_millis(250)).unwrap();
//!
//! let report = worker.shutdown().unwrap();
//! assert!(report.owner_joined);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `tether-core` | `WorkItem`, `TickHandler`, `Envelope`, `DispatchError` |
//! | [`engine`] | `tether-engine` | `WorkerThread`, `EngineConfig`, `WorkQueue`, metrics |
//! | [`timer`] | `tether-timer` | `TimerRegistry`, `Timer`, `TimerError` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core traits and the envelope type (`tether-core`).
///
/// Implement [`core::WorkItem`] or [`core::TickHandler`] for your own types
/// when a closure is not enough.
pub use tether_core as core;

/// The dispatch engine (`tether-engine`).
///
/// [`engine::WorkerThread`] owns the dispatch thread; [`engine::WorkQueue`]
/// is usable on its own as a blocking envelope queue.
pub use tether_engine as engine;

/// Tick-driven periodic timers (`tether-timer`).
pub use tether_timer as timer;

/// Common imports for typical Tether usage.
///
/// ```rust
/// use tether::prelude::*;
/// ```
pub mod prelude {
    // Core traits and errors
    pub use tether_core::{DispatchError, TickHandler, WorkItem};

    // Engine
    pub use tether_engine::{
        CreateError, DispatchMetrics, EngineConfig, ShutdownReport, WorkerThread,
    };

    // Timers
    pub use tether_timer::{Timer, TimerError, TimerRegistry};
}
