use fiberjobs::{JobSystem, JobSystemConfig, PinningStrategy};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn with_strategy(num_workers: usize, pinning: PinningStrategy) -> JobSystem {
    JobSystem::with_config(JobSystemConfig {
        pinning,
        ..JobSystemConfig::with_workers(num_workers)
    })
    .unwrap()
}

#[test]
fn test_none_strategy() {
    let job_system = with_strategy(4, PinningStrategy::None);
    assert_eq!(job_system.num_workers(), 4);
    job_system.shutdown().unwrap();
}

#[test]
fn test_linear_strategy() {
    let job_system = with_strategy(2, PinningStrategy::Linear);
    assert_eq!(job_system.num_workers(), 2);
    job_system.shutdown().unwrap();
}

#[test]
fn test_avoid_smt_strategy_wraps_around() {
    // More workers than cores: assignments wrap instead of failing.
    let job_system = with_strategy(10, PinningStrategy::AvoidSMT);
    assert_eq!(job_system.num_workers(), 10);

    let executed = Arc::new(AtomicUsize::new(0));
    let mut jobs = Vec::new();
    for _ in 0..100 {
        let executed_clone = executed.clone();
        jobs.push(Box::new(move || {
            executed_clone.fetch_add(1, Ordering::SeqCst);
        }) as Box<dyn FnOnce() + Send>);
    }

    let counter = job_system.run_multiple(jobs);
    job_system.wait(&counter);
    assert_eq!(executed.load(Ordering::SeqCst), 100);

    job_system.shutdown().unwrap();
}

#[test]
fn test_strategy_parsing() {
    assert_eq!("linear".parse::<PinningStrategy>(), Ok(PinningStrategy::Linear));
    assert_eq!("None".parse::<PinningStrategy>(), Ok(PinningStrategy::None));
    assert_eq!("avoid_smt".parse::<PinningStrategy>(), Ok(PinningStrategy::AvoidSMT));
    assert!("ccd".parse::<PinningStrategy>().is_err());
}

#[test]
fn test_default_worker_count() {
    let config = JobSystemConfig::default();
    let expected = num_cpus::get().saturating_sub(1).max(1);
    assert_eq!(config.worker_count(), expected);
}
