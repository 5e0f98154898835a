/*!
 * Serial Queue Benchmarks
 *
 * Queue throughput per backend, and a serial wrapper against a locked map
 */

use adaptive_sync::{BackendType, QueueConfig, SerialQueue, SerialWrapper};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

const TASKS: usize = 1_000;

fn backend_configs() -> Vec<(&'static str, QueueConfig)> {
    vec![
        (
            "portable",
            QueueConfig::default().with_backend(BackendType::Portable),
        ),
        (
            "work_queue",
            QueueConfig::default().with_backend(BackendType::WorkQueue),
        ),
        ("named", QueueConfig::named("bench-serial")),
    ]
}

fn bench_submit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_throughput");

    for (label, config) in backend_configs() {
        let queue = SerialQueue::with_config(config).unwrap();
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..TASKS)
                    .map(|i| queue.submit(move || black_box(i)))
                    .collect();
                for handle in handles {
                    handle.wait().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_sync_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_round_trip");

    for (label, config) in backend_configs() {
        let queue = SerialQueue::with_config(config).unwrap();
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| queue.sync(|| black_box(1)).unwrap());
        });
    }

    group.finish();
}

fn bench_wrapper_vs_mutex(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_map");

    for threads in [1, 4] {
        group.bench_with_input(BenchmarkId::new("serial_wrapper", threads), &threads, |b, &t| {
            let map = Arc::new(SerialWrapper::new(HashMap::<usize, usize>::new()).unwrap());
            b.iter(|| {
                let workers: Vec<_> = (0..t)
                    .map(|w| {
                        let map = map.clone();
                        thread::spawn(move || {
                            let handles: Vec<_> = (0..TASKS / t)
                                .map(|i| {
                                    map.apply(move |m| *m.entry(w * TASKS + i).or_default() += 1)
                                })
                                .collect();
                            for handle in handles {
                                handle.wait().unwrap();
                            }
                        })
                    })
                    .collect();
                for worker in workers {
                    worker.join().unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("mutex", threads), &threads, |b, &t| {
            let map = Arc::new(Mutex::new(HashMap::<usize, usize>::new()));
            b.iter(|| {
                let workers: Vec<_> = (0..t)
                    .map(|w| {
                        let map = map.clone();
                        thread::spawn(move || {
                            for i in 0..TASKS / t {
                                *map.lock().entry(w * TASKS + i).or_default() += 1;
                            }
                        })
                    })
                    .collect();
                for worker in workers {
                    worker.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_submit_throughput,
    bench_sync_round_trip,
    bench_wrapper_vs_mutex
);
criterion_main!(benches);
