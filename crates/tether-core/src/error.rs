//! Error types shared across the Tether workspace.
//!
//! Creation and configuration errors live next to the engine config;
//! timer errors live in `tether-timer`.

use thiserror::Error;

/// Errors from handing work to an owner thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The owner thread has not been created, or has already shut down.
    /// The rejected work item was dropped at the call site.
    #[error("owner thread is not running")]
    NotRunning,
    /// `shutdown()` was called from the owner thread, which cannot join
    /// itself.
    #[error("shutdown requested from the owner thread itself")]
    ShutdownFromOwner,
    /// The work item was discarded (or panicked) before it produced a result.
    #[error("work item was discarded before it produced a result")]
    Abandoned,
}
