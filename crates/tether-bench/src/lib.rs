//! Benchmark profiles and utilities for the Tether dispatch engine.
//!
//! - [`bench_config`]: engine configuration with the ticker disabled, so
//!   measurements only see work envelopes
//! - [`running_worker`]: a created engine ready to accept work
//! - [`flush`]: block until everything queued so far has executed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tether_core::DispatchError;
use tether_engine::{CreateError, EngineConfig, WorkerThread};

/// Engine configuration used by the benchmarks: named, no ticker.
pub fn bench_config(name: &str) -> EngineConfig {
    EngineConfig::named(name).without_ticker()
}

/// Create and start a worker with [`bench_config`].
pub fn running_worker(name: &str) -> Result<WorkerThread, CreateError> {
    let worker = WorkerThread::new(bench_config(name));
    worker.create()?;
    Ok(worker)
}

/// Wait for every item queued before this call to finish executing.
///
/// The queue is FIFO, so a round-trip `call` returns only after all
/// earlier work has run.
pub fn flush(worker: &WorkerThread) -> Result<(), DispatchError> {
    worker.call(|| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_waits_for_queued_work() {
        let worker = running_worker("bench-flush").unwrap();
        for _ in 0..100 {
            worker.dispatch(|| {}).unwrap();
        }
        flush(&worker).unwrap();
        assert_eq!(worker.metrics().work_executed, 101);
        worker.shutdown().unwrap();
    }
}
