//! Test utilities and probes for Tether development.
//!
//! Provides fixtures for observing what the dispatch engine does with the
//! work it is given ([`WorkProbe`], [`ExecutionLog`]), a tick handler that
//! counts ([`TickCounter`]), deadline polling ([`wait_until`]), and one-time
//! tracing setup for tests ([`init_test_logging`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod fixtures;

pub use fixtures::{ExecutionLog, Fate, TickCounter, WorkProbe};

use std::sync::Once;
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging at debug level.
///
/// Safe to call multiple times; only the first call installs a subscriber.
/// `RUST_LOG` overrides the level.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Poll `pred` every millisecond until it holds or `timeout` elapses.
///
/// Returns the final value of `pred`.
pub fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return pred();
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
