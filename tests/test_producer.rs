use fiberjobs::JobSystem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_producer_consumer_pattern() {
    let job_system = JobSystem::new(2).unwrap();
    let items_produced = Arc::new(AtomicUsize::new(0));
    let items_consumed = Arc::new(AtomicUsize::new(0));

    let produced = items_produced.clone();
    let consumed = items_consumed.clone();

    let counter = job_system.run_with_context(move |ctx| {
        let num_items = 20;
        let mut consumer_counters = vec![];

        for _ in 0..num_items {
            produced.fetch_add(1, Ordering::SeqCst);
            let consumed_clone = consumed.clone();

            let consumer = ctx.spawn_job(move |_ctx| {
                std::thread::sleep(Duration::from_micros(10));
                consumed_clone.fetch_add(1, Ordering::SeqCst);
            });
            consumer_counters.push(consumer);
        }

        for counter in &consumer_counters {
            ctx.wait(counter);
        }
    });

    job_system.wait(&counter);
    assert_eq!(items_produced.load(Ordering::SeqCst), 20);
    assert_eq!(items_consumed.load(Ordering::SeqCst), 20);
    job_system.shutdown().expect("Shutdown failed");
}

#[test]
fn test_many_external_waiters() {
    // Several non-worker threads each wait on their own batch at once.
    let job_system = Arc::new(JobSystem::new(2).unwrap());
    let consumed = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..6)
        .map(|_| {
            let job_system = job_system.clone();
            let consumed = consumed.clone();
            std::thread::spawn(move || {
                let mut jobs: Vec<Box<dyn FnOnce() + Send>> = Vec::new();
                for _ in 0..50 {
                    let consumed = consumed.clone();
                    jobs.push(Box::new(move || {
                        consumed.fetch_add(1, Ordering::SeqCst);
                    }));
                }
                let counter = job_system.run_multiple(jobs);
                job_system.wait(&counter);
                assert!(counter.is_complete());
            })
        })
        .collect();

    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(consumed.load(Ordering::SeqCst), 300);

    let job_system = Arc::try_unwrap(job_system).ok().expect("job system still shared");
    job_system.shutdown().expect("Shutdown failed");
}
