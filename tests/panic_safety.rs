use fiberjobs::{Counter, JobDecl, JobSystem};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn test_panic_safety_counter_decrement() {
    let job_system = JobSystem::new(1).unwrap();
    let counter = Counter::new();

    job_system.run_jobs(
        [JobDecl::new(|| panic!("Intentional panic for testing"))],
        Some(&counter),
    );

    // Counter should be decremented despite panic
    job_system.wait(&counter);
    assert_eq!(counter.value(), 0);
    job_system.shutdown().expect("worker should survive a job panic");
}

#[test]
fn test_worker_recovery_after_panic() {
    let job_system = JobSystem::new(1).unwrap();

    // 1. Panicking job
    let counter = job_system.run(|| panic!("Boom"));
    job_system.wait(&counter);

    // 2. Normal job to verify worker is still alive
    let success = Arc::new(AtomicBool::new(false));
    let success_clone = success.clone();
    let counter2 = job_system.run(move || {
        success_clone.store(true, Ordering::SeqCst);
    });
    job_system.wait(&counter2);

    assert!(success.load(Ordering::SeqCst), "Subsequent job failed to run");
    assert_eq!(job_system.free_fibers(), job_system.fiber_capacity());
    job_system.shutdown().unwrap();
}
