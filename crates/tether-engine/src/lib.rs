//! Owner-thread dispatch engine.
//!
//! A [`WorkerThread`] owns one dedicated thread that serializes three kinds
//! of events into a single ordered stream: work items posted by any
//! thread, ticks produced by an auxiliary timer ticker, and a terminal
//! shutdown request. Work runs one item at a time on the owner thread, in
//! arrival order, which gives otherwise unsynchronized state a single
//! thread of affinity.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
mod dispatch;
pub mod metrics;
pub mod queue;
mod ticker;
pub mod worker;

pub use config::{ConfigError, CreateError, EngineConfig};
pub use metrics::DispatchMetrics;
pub use queue::WorkQueue;
pub use worker::{ShutdownReport, WorkerThread};
