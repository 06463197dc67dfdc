//! Thread identity queries.

use std::sync::Arc;
use std::thread;

use tether_engine::{EngineConfig, WorkerThread};
use tether_test_utils::init_test_logging;

#[test]
fn owner_id_differs_from_callers() {
    init_test_logging();
    let worker = Arc::new(WorkerThread::new(EngineConfig::named("affinity")));
    assert_eq!(worker.owner_thread_id(), None);
    worker.create().unwrap();

    let owner = worker.owner_thread_id().unwrap();
    assert_ne!(owner, WorkerThread::current_thread_id());
    assert!(!worker.is_owner_thread());

    let other = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || {
            (
                WorkerThread::current_thread_id(),
                worker.is_owner_thread(),
            )
        })
        .join()
        .unwrap()
    };
    assert_ne!(other.0, owner);
    assert!(!other.1);

    worker.shutdown().unwrap();
}

#[test]
fn work_item_sees_itself_on_owner_thread() {
    let worker = Arc::new(WorkerThread::new(EngineConfig::named("inside")));
    worker.create().unwrap();
    let owner = worker.owner_thread_id().unwrap();

    let inner = Arc::clone(&worker);
    let (current, reported_owner, is_owner) = worker
        .call(move || {
            (
                WorkerThread::current_thread_id(),
                inner.owner_thread_id(),
                inner.is_owner_thread(),
            )
        })
        .unwrap();

    assert_eq!(current, owner);
    assert_eq!(reported_owner, Some(owner));
    assert!(is_owner);
    worker.shutdown().unwrap();
}

#[test]
fn owner_thread_carries_configured_name() {
    let worker = WorkerThread::new(EngineConfig::named("render-thread"));
    worker.create().unwrap();
    let name = worker
        .call(|| thread::current().name().map(str::to_owned))
        .unwrap();
    assert_eq!(name.as_deref(), Some("render-thread"));
    worker.shutdown().unwrap();
}

#[test]
fn owner_id_cleared_after_shutdown_and_renewed_on_create() {
    let worker = WorkerThread::new(EngineConfig::named("renew"));
    worker.create().unwrap();
    let first = worker.owner_thread_id().unwrap();
    worker.shutdown().unwrap();
    assert_eq!(worker.owner_thread_id(), None);

    worker.create().unwrap();
    let second = worker.owner_thread_id().unwrap();
    assert_ne!(first, second);
    worker.shutdown().unwrap();
}
