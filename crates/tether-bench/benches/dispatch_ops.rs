//! Criterion micro-benchmarks for enqueue throughput, call round-trips, and
//! raw work-queue operations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tether_bench::{flush, running_worker};
use tether_core::Envelope;
use tether_engine::WorkQueue;

fn bench_dispatch_throughput(c: &mut Criterion) {
    let worker = running_worker("bench-dispatch").unwrap();
    let mut group = c.benchmark_group("dispatch");
    for batch in [1u64, 64, 1024] {
        group.throughput(Throughput::Elements(batch));
        group.bench_function(format!("batch_{batch}"), |b| {
            b.iter(|| {
                for i in 0..batch {
                    worker
                        .dispatch(move || {
                            black_box(i);
                        })
                        .unwrap();
                }
                flush(&worker).unwrap();
            });
        });
    }
    group.finish();
    worker.shutdown().unwrap();
}

fn bench_call_round_trip(c: &mut Criterion) {
    let worker = running_worker("bench-call").unwrap();
    c.bench_function("call_round_trip", |b| {
        b.iter(|| black_box(worker.call(|| 7u64).unwrap()));
    });
    worker.shutdown().unwrap();
}

fn bench_create_shutdown(c: &mut Criterion) {
    c.bench_function("create_shutdown", |b| {
        b.iter(|| {
            let worker = running_worker("bench-cycle").unwrap();
            black_box(worker.shutdown().unwrap());
        });
    });
}

fn bench_queue_push_pop(c: &mut Criterion) {
    let queue = WorkQueue::new();
    queue.open();
    c.bench_function("queue_push_try_pop_1k", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                queue.push(Envelope::Tick).unwrap();
            }
            while let Some(envelope) = queue.try_pop() {
                black_box(envelope);
            }
        });
    });
}

fn bench_queue_drain(c: &mut Criterion) {
    c.bench_function("queue_close_and_drain_1k_work", |b| {
        b.iter_batched(
            || {
                let queue = WorkQueue::new();
                queue.open();
                for _ in 0..1000 {
                    queue.push(Envelope::work(|| {})).unwrap();
                }
                queue
            },
            |queue| black_box(queue.close_and_drain().len()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_dispatch_throughput,
    bench_call_round_trip,
    bench_create_shutdown,
    bench_queue_push_pop,
    bench_queue_drain
);
criterion_main!(benches);
