//! Shutdown protocol: bounded, leak-free, idempotent, and safe against
//! concurrent enqueues.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tether_core::DispatchError;
use tether_engine::{EngineConfig, ShutdownReport, WorkerThread};
use tether_test_utils::{init_test_logging, wait_until, Fate, WorkProbe};

fn quiet(name: &str) -> EngineConfig {
    EngineConfig::named(name).without_ticker()
}

/// Occupy the owner thread until the returned sender is dropped or sent to.
fn block_owner(worker: &WorkerThread) -> crossbeam_channel::Sender<()> {
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
    worker
        .dispatch(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        })
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    release_tx
}

#[test]
fn shutdown_is_bounded_with_deep_queue() {
    init_test_logging();
    let worker = WorkerThread::new(EngineConfig::named("deep"));
    worker.create().unwrap();
    for _ in 0..10_000 {
        worker.dispatch(|| {}).unwrap();
    }

    let start = Instant::now();
    let report = worker.shutdown().unwrap();
    let wall = start.elapsed();

    // Generous for slow CI runners; the ticker period is 100 ms.
    assert!(wall < Duration::from_secs(2), "shutdown took {wall:?}");
    assert!(report.owner_joined);
    assert_eq!(worker.metrics().work_executed, 10_000);
}

#[test]
fn shutdown_is_fast_with_slow_ticker() {
    let worker =
        WorkerThread::new(EngineConfig::named("slow-tick").with_tick_interval(Duration::from_secs(5)));
    worker.create().unwrap();
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    let report = worker.shutdown().unwrap();
    let wall_ms = start.elapsed().as_millis();
    assert!(
        wall_ms < 500,
        "shutdown took {wall_ms}ms with a 5s tick interval (report: {report:?})"
    );
}

#[test]
fn work_behind_shutdown_is_discarded_not_executed() {
    let worker = Arc::new(WorkerThread::new(quiet("discard")));
    worker.create().unwrap();
    let release = block_owner(&worker);

    let stopper = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.shutdown().unwrap())
    };
    // Wait for the Shutdown envelope to be queued behind the blocker.
    assert!(wait_until(Duration::from_secs(2), || !worker.is_running()
        && worker.queue_len() == 1));

    // Slow items queued after Shutdown: executing them would take 10s.
    let probes: Vec<WorkProbe> = (0..1000).map(|_| WorkProbe::new()).collect();
    for probe in &probes {
        worker
            .dispatch(probe.item_with(|| thread::sleep(Duration::from_millis(10))))
            .unwrap();
    }

    let start = Instant::now();
    drop(release);
    let report = stopper.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));

    assert_eq!(report.work_discarded, 1000);
    assert!(probes.iter().all(|p| p.fate() == Fate::Discarded));
    assert_eq!(worker.metrics().work_discarded, 1000);
}

#[test]
fn no_work_item_is_leaked() {
    let worker = Arc::new(WorkerThread::new(quiet("no-leak")));
    worker.create().unwrap();
    let release = block_owner(&worker);

    let before: Vec<WorkProbe> = (0..100).map(|_| WorkProbe::new()).collect();
    for probe in &before {
        worker.dispatch(probe.item()).unwrap();
    }
    let stopper = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.shutdown().unwrap())
    };
    // All 100 items plus the Shutdown envelope are queued behind the blocker.
    assert!(wait_until(Duration::from_secs(2), || worker.queue_len() == 101));
    let after: Vec<WorkProbe> = (0..100).map(|_| WorkProbe::new()).collect();
    for probe in &after {
        worker.dispatch(probe.item()).unwrap();
    }
    drop(release);
    stopper.join().unwrap();

    assert!(before.iter().all(|p| p.fate() == Fate::Executed));
    assert!(after.iter().all(|p| p.fate() == Fate::Discarded));
}

#[test]
fn shutdown_twice_second_is_noop() {
    let worker = WorkerThread::new(EngineConfig::named("twice"));
    worker.create().unwrap();
    let first = worker.shutdown().unwrap();
    assert!(first.owner_joined);
    let second = worker.shutdown().unwrap();
    assert_eq!(second, ShutdownReport::default());
}

#[test]
fn racing_enqueue_is_executed_xor_discarded() {
    for round in 0..50 {
        let worker = Arc::new(WorkerThread::new(quiet("race")));
        worker.create().unwrap();
        let probe = WorkProbe::new();

        let producer = {
            let worker = Arc::clone(&worker);
            let item = probe.item();
            thread::spawn(move || worker.dispatch(item))
        };
        let report = worker.shutdown().unwrap();
        let sent = producer.join().unwrap();

        match probe.fate() {
            Fate::Executed => assert!(sent.is_ok(), "round {round}: executed but rejected"),
            Fate::Discarded => {
                if sent.is_ok() {
                    assert_eq!(report.work_discarded, 1, "round {round}");
                } else {
                    assert_eq!(sent, Err(DispatchError::NotRunning));
                }
            }
            Fate::Pending => panic!("round {round}: work item neither executed nor disposed"),
        }
    }
}

#[test]
fn recreate_after_shutdown_accepts_work_again() {
    let worker = WorkerThread::new(quiet("recreate"));
    worker.create().unwrap();
    worker.shutdown().unwrap();
    assert!(worker.dispatch(|| {}).is_err());

    worker.create().unwrap();
    assert_eq!(worker.call(|| "again").unwrap(), "again");
    worker.shutdown().unwrap();
}

#[test]
fn queued_call_abandoned_by_shutdown() {
    let worker = Arc::new(WorkerThread::new(quiet("abandon")));
    worker.create().unwrap();
    let release = block_owner(&worker);

    let stopper = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.shutdown().unwrap())
    };
    assert!(wait_until(Duration::from_secs(2), || !worker.is_running()
        && worker.queue_len() == 1));

    let caller = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.call(|| 1))
    };
    assert!(wait_until(Duration::from_secs(2), || worker.queue_len() == 2));
    drop(release);
    stopper.join().unwrap();
    assert_eq!(caller.join().unwrap(), Err(DispatchError::Abandoned));
}

#[test]
fn panicking_drop_of_discarded_work_keeps_engine_reusable() {
    struct PanicOnDrop;
    impl Drop for PanicOnDrop {
        fn drop(&mut self) {
            panic!("discarded item failed to drop");
        }
    }

    // Long interval: no Tick lands in the queue while the owner is blocked.
    let worker = Arc::new(WorkerThread::new(
        EngineConfig::named("drop-panic").with_tick_interval(Duration::from_secs(10)),
    ));
    worker.create().unwrap();
    let release = block_owner(&worker);

    let stopper = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.shutdown().unwrap())
    };
    assert!(wait_until(Duration::from_secs(2), || !worker.is_running()
        && worker.queue_len() == 1));
    let probe = WorkProbe::new();
    let guard = PanicOnDrop;
    worker.dispatch(move || drop(guard)).unwrap();
    worker.dispatch(probe.item()).unwrap();
    drop(release);

    let report = stopper.join().unwrap();
    assert!(report.owner_joined, "owner thread died: {report:?}");
    assert_eq!(report.work_discarded, 2);
    assert_eq!(probe.fate(), Fate::Discarded);
    assert_eq!(worker.metrics().work_panics, 1);

    // The tick handler came back with the owner thread, so the handle
    // can be created again.
    worker.create().unwrap();
    assert_eq!(worker.call(|| 3).unwrap(), 3);
    worker.shutdown().unwrap();
}
