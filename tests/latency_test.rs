use fiberjobs::JobSystem;

use std::time::Instant;

#[test]
fn test_suspend_resume_latency() {
    // One worker, so every wait is a fiber switch on the same thread.
    let job_system = JobSystem::new(1).unwrap();

    let rounds = 2_000;

    let start = Instant::now();

    let c = job_system.run_with_context(move |ctx| {
        for _ in 0..rounds {
            let child = ctx.spawn_job(|_| {});
            ctx.wait(&child);
        }
    });

    job_system.wait(&c);
    let duration = start.elapsed();

    println!("Performed {} spawn/wait rounds in {:?}", rounds, duration);

    // Each round is two fiber switches plus queue traffic. If waiting fell
    // back to the idle timeout, 2000 rounds would take seconds.
    assert!(
        duration.as_millis() < 1_500,
        "Suspend/resume too slow, waits are likely timing out: {:?}",
        duration
    );

    job_system.shutdown().unwrap();
}
