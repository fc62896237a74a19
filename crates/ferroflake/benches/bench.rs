use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ferroflake::{
    AtomicFlakeGenerator, FlakeGenerator, LockFlakeGenerator, MonotonicClock, Poll, ThreadRandom,
    TimeSource, WorkerId,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::{Instant, SystemTime},
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (shared across threads for
// multi-threaded). Exactly one sequence window.
const TOTAL_IDS: usize = 4096;

fn thread_counts() -> Vec<usize> {
    let mut counts = vec![1, 2, 4, 8, num_cpus::get()];
    counts.sort_unstable();
    counts.dedup();
    counts
}

/// Benchmarks a hot-path generator where IDs are always `Ready`.
fn bench_generator<G, T>(c: &mut Criterion, group_name: &str, generator_factory: impl Fn() -> G)
where
    G: FlakeGenerator<T>,
    T: TimeSource,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_id() {
                        Ok(Poll::Ready { id }) => {
                            black_box(id);
                        }
                        other => unreachable!("{other:?}"),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks the blocking path against a real clock, spinning on exhaustion.
fn bench_generator_blocking<G, T>(
    c: &mut Criterion,
    group_name: &str,
    generator_factory: impl Fn() -> G,
) where
    G: FlakeGenerator<T>,
    T: TimeSource,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks a generator shared across threads.
fn bench_generator_contended<G, T>(
    c: &mut Criterion,
    group_name: &str,
    generator_fn: impl Fn() -> G,
) where
    G: FlakeGenerator<T> + Send + Sync,
    T: TimeSource,
{
    let mut group = c.benchmark_group(group_name);

    for thread_count in thread_counts() {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements((ids_per_thread * thread_count) as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{thread_count}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();

                for _ in 0..iters {
                    let generator = Arc::new(generator_fn());
                    let barrier = Arc::new(Barrier::new(thread_count + 1));
                    scope(|s| {
                        for _ in 0..thread_count {
                            let generator = Arc::clone(&generator);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..ids_per_thread {
                                    black_box(generator.next_id().unwrap());
                                }
                            });
                        }
                        barrier.wait();
                    });
                }

                start.elapsed()
            });
        });
    }

    group.finish();
}

// --- MOCK CLOCK (never yields within one window) ---

/// Single-threaded benchmark for `LockFlakeGenerator` with a fixed clock.
fn benchmark_mock_sequential_lock(c: &mut Criterion) {
    bench_generator(c, "mock/sequential/lock", || {
        LockFlakeGenerator::new(WorkerId::ZERO, FixedMockTime { millis: 1 })
    });
}

/// Single-threaded benchmark for `AtomicFlakeGenerator` with a fixed clock.
fn benchmark_mock_sequential_atomic(c: &mut Criterion) {
    bench_generator(c, "mock/sequential/atomic", || {
        AtomicFlakeGenerator::new(WorkerId::ZERO, FixedMockTime { millis: 1 })
    });
}

/// Multithreaded benchmark for `LockFlakeGenerator` with a fixed clock.
/// Measures raw lock contention; the lock never skips sequence values so one
/// window is always enough.
fn benchmark_mock_contended_lock(c: &mut Criterion) {
    bench_generator_contended(c, "mock/contended/lock", || {
        LockFlakeGenerator::new(WorkerId::ZERO, FixedMockTime { millis: 1 })
    });
}

// --- MONOTONIC CLOCK (realistic time with potential spinning) ---

fn benchmark_mono_sequential_lock(c: &mut Criterion) {
    let clock = MonotonicClock::default();
    bench_generator_blocking(c, "mono/sequential/lock", || {
        LockFlakeGenerator::new(WorkerId::process(), clock)
    });
}

fn benchmark_mono_sequential_atomic(c: &mut Criterion) {
    let clock = MonotonicClock::default();
    bench_generator_blocking(c, "mono/sequential/atomic", || {
        AtomicFlakeGenerator::new(WorkerId::process(), clock)
    });
}

/// Multithreaded benchmark for `LockFlakeGenerator` with `MonotonicClock`.
fn benchmark_mono_contended_lock(c: &mut Criterion) {
    let clock = MonotonicClock::default();
    bench_generator_contended(c, "mono/contended/lock", || {
        LockFlakeGenerator::new(WorkerId::process(), clock)
    });
}

/// Multithreaded benchmark for `AtomicFlakeGenerator` with `MonotonicClock`.
/// Lost CAS races skip sequence values, so threads may spin for the next
/// millisecond.
fn benchmark_mono_contended_atomic(c: &mut Criterion) {
    let clock = MonotonicClock::default();
    bench_generator_contended(c, "mono/contended/atomic", || {
        AtomicFlakeGenerator::new(WorkerId::process(), clock)
    });
}

// --- ENCODING ---

fn benchmark_new_id_at(c: &mut Criterion) {
    let generator = LockFlakeGenerator::default();
    let now = SystemTime::now();
    c.bench_function("new_id_at", |b| {
        b.iter(|| black_box(generator.new_id_at(black_box(now)).unwrap()));
    });
}

fn benchmark_parse(c: &mut Criterion) {
    let generator = LockFlakeGenerator::default();
    let id = generator.next_id().unwrap();
    c.bench_function("parse", |b| {
        b.iter(|| black_box(generator.parse(black_box(id))));
    });
}

fn benchmark_worker_resolve(c: &mut Criterion) {
    let rand = ThreadRandom;
    c.bench_function("worker/resolve", |b| {
        b.iter(|| black_box(WorkerId::resolve(&rand)));
    });
}

criterion_group!(
    benches,
    // Mock clock
    benchmark_mock_sequential_lock,
    benchmark_mock_sequential_atomic,
    benchmark_mock_contended_lock,
    // Monotonic clock
    benchmark_mono_sequential_lock,
    benchmark_mono_sequential_atomic,
    benchmark_mono_contended_lock,
    benchmark_mono_contended_atomic,
    // Encoding
    benchmark_new_id_at,
    benchmark_parse,
    benchmark_worker_resolve,
);
criterion_main!(benches);
