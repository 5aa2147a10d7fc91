//! High-level job system interface.
//!
//! The JobSystem is the primary entry point for scheduling and managing
//! parallel work. It provides a clean API for submitting jobs, tracking
//! their completion via counters, and waiting for results.

use crate::config::JobSystemConfig;
use crate::context::Context;
use crate::counter::Counter;
use crate::error::JobSystemError;
use crate::job::JobDecl;
use crate::scheduler::Scheduler;
use crate::worker::WorkerPool;
use std::sync::Arc;

/// The main job system managing worker threads and job execution.
///
/// Creating one starts the workers and pre-allocates the fiber pool;
/// [`shutdown`](JobSystem::shutdown) (or dropping it) stops them again.
pub struct JobSystem {
    worker_pool: Option<WorkerPool>,
    context: Context,
}

impl JobSystem {
    /// Creates a new job system with the specified number of worker threads.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fiberjobs::JobSystem;
    ///
    /// let job_system = JobSystem::new(4).unwrap();
    /// job_system.shutdown().unwrap();
    /// ```
    pub fn new(num_threads: usize) -> Result<Self, JobSystemError> {
        Self::with_config(JobSystemConfig::with_workers(num_threads))
    }

    /// Creates a job system with one worker per CPU core, minus one for
    /// the calling thread.
    pub fn with_default_workers() -> Result<Self, JobSystemError> {
        Self::with_config(JobSystemConfig::default())
    }

    /// Creates a new job system with custom configuration.
    pub fn with_config(config: JobSystemConfig) -> Result<Self, JobSystemError> {
        let scheduler = Arc::new(Scheduler::new(&config)?);

        let worker_pool =
            match WorkerPool::start(Arc::clone(&scheduler), config.worker_count(), config.pinning) {
                Ok(pool) => pool,
                Err(err) => {
                    scheduler.teardown();
                    return Err(err);
                }
            };

        Ok(JobSystem {
            worker_pool: Some(worker_pool),
            context: Context::new(scheduler),
        })
    }

    /// Submits a batch of jobs.
    ///
    /// `counter` is raised by the batch size before any job can run and
    /// lowered by one as each job finishes. Pass `None` for jobs nobody
    /// will wait on. Jobs are dispatched most-recent-first.
    ///
    /// # Panics
    ///
    /// Panics if `jobs` is empty.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fiberjobs::{Counter, JobDecl, JobSystem};
    ///
    /// let job_system = JobSystem::new(4).unwrap();
    /// let counter = Counter::new();
    /// job_system.run_jobs(
    ///     [JobDecl::new(|| println!("Job 1")), JobDecl::new(|| println!("Job 2"))],
    ///     Some(&counter),
    /// );
    /// job_system.wait(&counter);
    /// ```
    pub fn run_jobs<I>(&self, jobs: I, counter: Option<&Counter>)
    where
        I: IntoIterator<Item = JobDecl>,
    {
        self.context.run_jobs(jobs, counter);
    }

    /// Submits a single job and returns a counter tracking it.
    pub fn run<F>(&self, work: F) -> Counter
    where
        F: FnOnce() + Send + 'static,
    {
        let counter = Counter::new();
        self.run_jobs([JobDecl::new(work)], Some(&counter));
        counter
    }

    /// Submits multiple jobs and returns a counter tracking all of them.
    pub fn run_multiple<I>(&self, jobs: I) -> Counter
    where
        I: IntoIterator<Item = Box<dyn FnOnce() + Send + 'static>>,
    {
        let counter = Counter::new();
        self.run_jobs(jobs.into_iter().map(JobDecl::new), Some(&counter));
        counter
    }

    /// Submits a job with context access for nested parallelism.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fiberjobs::JobSystem;
    ///
    /// let job_system = JobSystem::new(4).unwrap();
    /// let counter = job_system.run_with_context(|ctx| {
    ///     let child = ctx.spawn_job(|_| println!("Child job"));
    ///     ctx.wait(&child);
    /// });
    /// job_system.wait(&counter);
    /// ```
    pub fn run_with_context<F>(&self, work: F) -> Counter
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        self.context.spawn_job(work)
    }

    /// Waits for a counter to reach zero (all tracked jobs completed).
    ///
    /// If running in a fiber, this suspends the fiber and lets the worker
    /// run other jobs. On any other thread it sleeps on an event that a
    /// helper job triggers, re-checking the counter at a bounded interval.
    pub fn wait(&self, counter: &Counter) {
        self.context.wait(counter);
    }

    /// A cloneable handle for submitting and waiting from inside jobs.
    pub fn context(&self) -> Context {
        self.context.clone()
    }

    /// Returns the number of worker threads in the system.
    pub fn num_workers(&self) -> usize {
        self.worker_pool.as_ref().map_or(0, WorkerPool::size)
    }

    /// Total number of pooled fibers.
    pub fn fiber_capacity(&self) -> usize {
        self.context.scheduler().fiber_capacity()
    }

    /// Fibers neither running nor suspended.
    pub fn free_fibers(&self) -> usize {
        self.context.scheduler().free_fibers()
    }

    /// Fibers parked in `wait`.
    pub fn sleeping_fibers(&self) -> usize {
        self.context.scheduler().sleeping_fibers()
    }

    /// Jobs submitted but not yet started.
    pub fn queued_jobs(&self) -> usize {
        self.context.scheduler().queued_jobs()
    }

    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.context.scheduler().metrics().snapshot()
    }

    /// Shuts down the job system.
    ///
    /// Jobs already running finish; queued jobs and suspended fibers are
    /// discarded. Returns `Err` if any worker thread panicked.
    pub fn shutdown(mut self) -> Result<(), JobSystemError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), JobSystemError> {
        let Some(pool) = self.worker_pool.take() else {
            return Ok(());
        };
        let result = pool.shutdown();
        self.context.scheduler().teardown();
        result
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(error = %err, "job system shutdown failed");
        }
    }
}
