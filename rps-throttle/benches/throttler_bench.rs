use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;

use rps_throttle::LockingThrottler;
use rps_throttle::NanoClock;
use rps_throttle::RingThrottler;
use rps_throttle::Rps;
use rps_throttle::SequentialThrottler;
use rps_throttle::Throttler;
use rps_throttle::ThrottlingResult;
use rps_throttle::TimeSource;

// Wrapper to bridge Governor into the Throttler trait
#[derive(Debug)]
struct GovernorThrottler {
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
    rps: Rps,
    clock: NanoClock,
}

impl Throttler for GovernorThrottler {
    fn rps(&self) -> Rps {
        self.rps
    }

    fn try_acquire(&self) -> ThrottlingResult {
        ThrottlingResult::new(self.limiter.check().is_ok(), self.clock.now())
    }
}

fn bench_single_throttler<T: Throttler>(group_name: &str, c: &mut Criterion, throttler: &T) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("single-threaded", |b| {
        b.iter(|| {
            let _ = black_box(throttler).try_acquire();
        })
    });

    group.bench_function("single-threaded-action", |b| {
        b.iter(|| {
            let _ = black_box(throttler).try_throttle(|| {
                black_box(());
            });
        })
    });

    group.finish();
}

fn bench_parallel_throttler<T: Throttler + Send + Sync + 'static>(
    group_name: &str,
    c: &mut Criterion,
    throttler: Arc<T>,
) {
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for _ in 0..n {
                        let t = Arc::clone(&throttler);
                        let bar = Arc::clone(&barrier);
                        let iters_per_thread = iters / n as u64;

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for _ in 0..iters_per_thread {
                                let _ = black_box(t.try_acquire());
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn bench_dynamic_throttler(
    group_name: &str,
    c: &mut Criterion,
    throttler: Arc<dyn Throttler + Send + Sync>,
) {
    let mut group = c.benchmark_group(format!("Dynamic-{}", group_name));

    group.bench_function("single-threaded", |b| {
        b.iter(|| {
            let _ = black_box(throttler.as_ref()).try_acquire();
        })
    });

    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let limit_val = Rps::MAX;
    let rps = Rps::new(i64::from(limit_val)).expect("valid budget");

    // --- 1. Initialize all throttlers ---

    let sequential = SequentialThrottler::with_clock(rps, NanoClock::shared());
    let locking = Arc::new(LockingThrottler::with_clock(rps, NanoClock::shared()));
    let ring = Arc::new(RingThrottler::with_clock(rps, NanoClock::shared()));

    // Governor setup
    let gov_quota = Quota::per_second(NonZeroU32::new(limit_val).expect("non-zero budget"));
    let gov = Arc::new(GovernorThrottler {
        limiter: RateLimiter::direct_with_clock(gov_quota, QuantaClock::default()),
        rps,
        clock: NanoClock::shared(),
    });

    // --- 2. Run Static Dispatch Benches (Direct calls) ---

    // SequentialThrottler is !Sync, so it only runs on one thread
    bench_single_throttler("Sequential-Static", c, &sequential);

    bench_single_throttler("Locking-Static", c, locking.as_ref());
    bench_parallel_throttler("Locking-Static", c, locking.clone());

    bench_single_throttler("Ring-Static", c, ring.as_ref());
    bench_parallel_throttler("Ring-Static", c, ring.clone());

    bench_single_throttler("Governor-Static", c, gov.as_ref());
    bench_parallel_throttler("Governor-Static", c, gov.clone());

    // --- 3. Run Dynamic Dispatch Benches (Trait Objects) ---

    let throttlers: Vec<(&str, Arc<dyn Throttler + Send + Sync>)> =
        vec![("Locking", locking), ("Ring", ring), ("Governor", gov)];

    for (name, throttler) in throttlers {
        bench_dynamic_throttler(name, c, throttler);
    }
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
