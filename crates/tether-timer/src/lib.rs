//! Tick-driven periodic timers for Tether.
//!
//! A [`TimerRegistry`] holds a set of [`Timer`]s and fires the ones that
//! are due each time it is processed. The registry implements
//! [`TickHandler`](tether_core::TickHandler), so installing a clone of it
//! as an engine's tick handler runs every timer callback on the owner
//! thread, once per tick at most:
//!
//! ```no_run
//! use std::time::Duration;
//! use tether_timer::TimerRegistry;
//!
//! let registry = TimerRegistry::new();
//! let heartbeat = registry.timer(|| println!("beat"));
//! heartbeat.start(Duration::from_secs(1)).unwrap();
//! // WorkerThread::with_tick_handler(config, registry.clone())
//! ```
//!
//! Timer resolution is bounded by how often the registry is processed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod registry;

pub use error::TimerError;
pub use registry::{Timer, TimerId, TimerRegistry};
