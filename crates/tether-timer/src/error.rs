//! Timer errors.

use std::time::Duration;

use thiserror::Error;

/// Errors from arming a [`Timer`](crate::Timer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TimerError {
    /// A periodic timer needs a non-zero period.
    #[error("timer period must be non-zero")]
    ZeroPeriod,
    /// The first expiry would fall beyond the range of [`std::time::Instant`].
    #[error("timer period {period:?} is too long")]
    PeriodTooLong {
        /// The rejected period.
        period: Duration,
    },
}
