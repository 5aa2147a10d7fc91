use fiberjobs::{Counter, JobDecl, JobSystemConfig, global};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match JobSystemConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "bad configuration");
            std::process::exit(2);
        }
    };
    let workers = config.worker_count();
    if !global::init_with_config(config) {
        std::process::exit(1);
    }
    println!("fiberjobs demo with {workers} worker threads\n");

    // Example 1: A small batch sharing a list
    println!("Example 1: Batch of three jobs");
    let list = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let counter = Counter::new();
    let jobs = ['A', 'B', 'C'].map(|id| {
        let list = list.clone();
        JobDecl::new(move || list.lock().push(id))
    });
    global::run_jobs(jobs, Some(&counter));
    global::wait(&counter);
    println!("  Jobs ran in order {:?}\n", list.lock());

    // Example 2: Jobs waiting on their own children
    println!("Example 2: Nested jobs");
    let sum = Arc::new(AtomicUsize::new(0));
    let parents = Counter::new();
    let jobs = (0..8).map(|p| {
        let sum = sum.clone();
        JobDecl::new(move || {
            let children = Counter::new();
            let jobs = (0..16).map(|c| {
                let sum = sum.clone();
                JobDecl::new(move || {
                    sum.fetch_add(p * 16 + c, Ordering::SeqCst);
                })
            });
            global::run_jobs(jobs, Some(&children));
            // Suspends this fiber, not the worker thread.
            global::wait(&children);
        })
    });
    global::run_jobs(jobs, Some(&parents));
    global::wait(&parents);
    let expected: usize = (0..128).sum();
    println!("  Sum result: {} (expected: {})\n", sum.load(Ordering::SeqCst), expected);

    // Example 3: High-throughput test
    println!("Example 3: High-throughput batch");
    let num_jobs = 100_000;
    let start = Instant::now();
    let counter = Counter::new();
    global::run_jobs(
        (0..num_jobs).map(|_| JobDecl::new(|| { std::hint::black_box(1 + 1); })),
        Some(&counter),
    );
    global::wait(&counter);
    let duration = start.elapsed();
    println!("  Executed {} jobs in {:?}", num_jobs, duration);
    println!(
        "  Throughput: {:.0} jobs/sec\n",
        num_jobs as f64 / duration.as_secs_f64()
    );

    global::shutdown();
    println!("Job system shut down");
}
