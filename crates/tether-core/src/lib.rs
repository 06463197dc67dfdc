//! Core types and traits for the Tether owner-thread dispatch engine.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by the engine, the timer subsystem, and test fixtures:
//! the [`WorkItem`] capability, the [`Envelope`] that carries it through
//! the work queue, the [`TickHandler`] invoked once per timer period, and
//! the dispatch error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod tick;
pub mod work;

pub use envelope::{Envelope, EnvelopeKind};
pub use error::DispatchError;
pub use tick::TickHandler;
pub use work::WorkItem;
