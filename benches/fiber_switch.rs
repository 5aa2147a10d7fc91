//! Fiber switch latency benchmark using criterion.
//!
//! `raw_switch` drives a pooled fiber directly and measures one
//! start-to-finish round trip. `suspend_resume` goes through the scheduler:
//! a job submits a child and waits on it, parking its fiber once per round.

use criterion::{Criterion, criterion_group, criterion_main};
use fiberjobs::fiber::{Fiber, FiberInput};
use fiberjobs::job::Job;
use fiberjobs::{JobDecl, JobSystem};

fn bench_raw_switch(c: &mut Criterion) {
    let mut fiber = Fiber::new(64 * 1024).expect("stack allocation");

    c.bench_function("raw_switch", |b| {
        b.iter(|| {
            let job = Job::new(JobDecl::new(|| std::hint::black_box(())), None);
            let state = fiber.resume(FiberInput::Start(job));
            debug_assert!(state.is_none());
        })
    });
}

fn bench_suspend_resume(c: &mut Criterion) {
    let system = JobSystem::new(1).expect("job system");
    const ROUNDS: u64 = 1_000;

    let mut group = c.benchmark_group("suspend_resume");
    group.throughput(criterion::Throughput::Elements(ROUNDS));
    group.bench_function("spawn_wait_1k", |b| {
        b.iter(|| {
            let root = system.run_with_context(|ctx| {
                for _ in 0..ROUNDS {
                    let child = ctx.spawn_job(|_| {});
                    ctx.wait(&child);
                }
            });
            system.wait(&root);
        })
    });
    group.finish();

    system.shutdown().expect("shutdown");
}

criterion_group!(benches, bench_raw_switch, bench_suspend_resume);
criterion_main!(benches);
