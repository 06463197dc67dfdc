//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is the constructor input for a
//! [`WorkerThread`](crate::WorkerThread). [`validate()`](EngineConfig::validate)
//! checks it before any thread is spawned, so a bad name or interval is
//! reported as a [`ConfigError`] rather than a spawn panic.

use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Default period between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Longest accepted tick interval. Longer periods are better expressed as
/// a disabled ticker.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default owner thread name.
pub const DEFAULT_THREAD_NAME: &str = "tether-worker";

// ── EngineConfig ──────────────────────────────────────────────────

/// Configuration for one owner thread and its ticker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Owner thread name. The ticker thread is named `"{name}-ticker"`.
    /// Default: `"tether-worker"`.
    pub name: String,
    /// Period between [`Tick`](tether_core::Envelope::Tick) envelopes.
    /// `None` disables the ticker. Default: 100 ms.
    pub tick_interval: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_THREAD_NAME.to_string(),
            tick_interval: Some(DEFAULT_TICK_INTERVAL),
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given thread name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replace the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Disable the ticker: no tick envelopes are produced.
    pub fn without_ticker(mut self) -> Self {
        self.tick_interval = None;
        self
    }

    /// Name given to the ticker thread.
    pub fn ticker_name(&self) -> String {
        format!("{}-ticker", self.name)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        // std::thread::Builder panics on interior NUL bytes.
        if self.name.contains('\0') {
            return Err(ConfigError::NulInName {
                name: self.name.escape_default().to_string(),
            });
        }
        if let Some(interval) = self.tick_interval {
            if interval.is_zero() {
                return Err(ConfigError::ZeroTickInterval);
            }
            // The ticker computes deadlines as `Instant + interval`.
            if interval > MAX_TICK_INTERVAL || Instant::now().checked_add(interval).is_none() {
                return Err(ConfigError::TickIntervalTooLong { interval });
            }
        }
        Ok(())
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected by [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The thread name is empty.
    #[error("thread name must not be empty")]
    EmptyName,
    /// The thread name contains a NUL byte.
    #[error("thread name {name:?} contains a NUL byte")]
    NulInName {
        /// The offending name, escaped.
        name: String,
    },
    /// `tick_interval` is `Some(Duration::ZERO)`.
    #[error("tick_interval must be non-zero (use None to disable ticks)")]
    ZeroTickInterval,
    /// `tick_interval` exceeds [`MAX_TICK_INTERVAL`].
    #[error(
        "tick_interval {interval:?} is too long (max {max:?}; use None to disable ticks)",
        max = MAX_TICK_INTERVAL
    )]
    TickIntervalTooLong {
        /// The rejected interval.
        interval: Duration,
    },
}

// ── CreateError ───────────────────────────────────────────────────

/// Errors from [`WorkerThread::create`](crate::WorkerThread::create).
///
/// Any of these leaves the handle idle: no owner thread exists, so no
/// dispatch is possible until a later `create` succeeds.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The configuration is invalid.
    #[error("invalid engine config: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// The operating system refused to spawn the owner thread.
    #[error("failed to spawn owner thread '{name}': {source}")]
    Spawn {
        /// Name of the thread that failed to spawn.
        name: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// Another thread is inside `shutdown()` for this handle.
    #[error("owner thread is shutting down")]
    ShutdownInProgress,
    /// The tick handler was not handed back: the previous owner thread
    /// panicked outside the dispatch boundary, or its spawn failed.
    #[error("tick handler could not be recovered from the previous owner thread")]
    TickHandlerLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.name, "tether-worker");
        assert_eq!(config.tick_interval, Some(Duration::from_millis(100)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_compose() {
        let config = EngineConfig::named("ui").with_tick_interval(Duration::from_millis(5));
        assert_eq!(config.name, "ui");
        assert_eq!(config.ticker_name(), "ui-ticker");
        assert_eq!(config.tick_interval, Some(Duration::from_millis(5)));
        assert_eq!(config.without_ticker().tick_interval, None);
    }

    #[test]
    fn empty_name_rejected() {
        let config = EngineConfig::named("");
        assert_eq!(config.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn nul_in_name_rejected() {
        let config = EngineConfig::named("bad\0name");
        match config.validate() {
            Err(ConfigError::NulInName { name }) => assert_eq!(name, "bad\\u{0}name"),
            other => panic!("expected NulInName, got {other:?}"),
        }
    }

    #[test]
    fn zero_interval_rejected() {
        let config = EngineConfig::default().with_tick_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickInterval));
    }

    #[test]
    fn overflowing_interval_rejected() {
        let config = EngineConfig::default().with_tick_interval(Duration::MAX);
        assert_eq!(
            config.validate(),
            Err(ConfigError::TickIntervalTooLong {
                interval: Duration::MAX
            })
        );
        let just_over = MAX_TICK_INTERVAL + Duration::from_nanos(1);
        assert!(matches!(
            EngineConfig::default().with_tick_interval(just_over).validate(),
            Err(ConfigError::TickIntervalTooLong { .. })
        ));
        assert!(EngineConfig::default()
            .with_tick_interval(MAX_TICK_INTERVAL)
            .validate()
            .is_ok());
    }

    #[test]
    fn disabled_ticker_is_valid() {
        assert!(EngineConfig::default().without_ticker().validate().is_ok());
    }

    #[test]
    fn create_error_wraps_config_error() {
        let err: CreateError = ConfigError::EmptyName.into();
        assert!(matches!(err, CreateError::InvalidConfig(ConfigError::EmptyName)));
        assert_eq!(
            err.to_string(),
            "invalid engine config: thread name must not be empty"
        );
    }
}
