use std::error::Error;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use rps_throttle::LockingThrottler;
use rps_throttle::NanoClock;
use rps_throttle::RingThrottler;
use rps_throttle::Rps;
use rps_throttle::SequentialThrottler;
use rps_throttle::Throttler;
use rps_throttle::ThrottlingResult;
use rps_throttle::TimeSource;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Variant {
    Sequential,
    Locking,
    Ring,
}

/// Hammer a throttler from several threads and check the sliding window bound.
#[derive(Debug, Parser)]
struct Args {
    /// Throttler to exercise
    #[arg(long, value_enum, default_value = "ring")]
    variant: Variant,

    /// Admitted requests per second
    #[arg(long, default_value_t = 10_000)]
    rps: i64,

    /// Number of client threads (ignored for the sequential variant)
    #[arg(long, default_value_t = 8)]
    threads: usize,

    /// How long each client keeps sending, e.g. "3s" or "500ms"
    #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
    duration: Duration,
}

fn run_clients<T>(throttler: Arc<T>, threads: usize, duration: Duration) -> Vec<ThrottlingResult>
where
    T: Throttler + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let throttler = Arc::clone(&throttler);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let start = Instant::now();
                let mut results = Vec::new();
                while start.elapsed() < duration {
                    results.push(throttler.try_acquire());
                }
                results
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|h| h.join().unwrap_or_default())
        .collect()
}

fn run_sequential(throttler: &SequentialThrottler, duration: Duration) -> Vec<ThrottlingResult> {
    let start = Instant::now();
    let mut results = Vec::new();
    while start.elapsed() < duration {
        results.push(throttler.try_acquire());
    }
    results
}

/// Largest number of admissions inside any trailing window.
fn busiest_window<C: TimeSource>(clock: &C, results: &mut [ThrottlingResult]) -> usize {
    results.sort_by_key(ThrottlingResult::time);

    let mut left = 0;
    let mut admitted = 0;
    let mut busiest = 0;
    for right in 0..results.len() {
        if results[right].passed() {
            admitted += 1;
        }
        while !clock.inside_window(results[left].time(), results[right].time()) {
            if results[left].passed() {
                admitted -= 1;
            }
            left += 1;
        }
        busiest = busiest.max(admitted);
    }
    busiest
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let rps = Rps::new(args.rps)?;
    let clock = NanoClock::shared();

    println!("Starting stress test...");
    println!("Variant: {:?} ({rps}), Threads: {}", args.variant, args.threads);
    println!("Duration: {}\n", humantime::format_duration(args.duration));

    let start = Instant::now();
    let mut results = match args.variant {
        Variant::Sequential => {
            run_sequential(&SequentialThrottler::new(args.rps)?, args.duration)
        }
        Variant::Locking => run_clients(
            Arc::new(LockingThrottler::new(args.rps)?),
            args.threads,
            args.duration,
        ),
        Variant::Ring => run_clients(
            Arc::new(RingThrottler::new(args.rps)?),
            args.threads,
            args.duration,
        ),
    };
    let total_duration = start.elapsed();

    let passed = results.iter().filter(|r| r.passed()).count();
    let busiest = busiest_window(&clock, &mut results);

    println!("--- {:?} ---", args.variant);
    println!("Total Duration:  {:.2?}", total_duration);
    println!("Passed/Total:    {}/{}", passed, results.len());
    println!(
        "Attempt Rate:    {:.2} req/sec",
        results.len() as f64 / total_duration.as_secs_f64()
    );
    println!(
        "Admit Rate:      {:.2} req/sec",
        passed as f64 / total_duration.as_secs_f64()
    );
    println!("Busiest Window:  {} (limit {})", busiest, rps.get());

    if busiest > rps.get() as usize {
        return Err(format!("window admitted {busiest}, limit is {}", rps.get()).into());
    }
    Ok(())
}
