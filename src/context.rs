//! Context type for access to job system capabilities from within jobs.

use crate::counter::Counter;
use crate::job::JobDecl;
use crate::scheduler::Scheduler;
use std::sync::Arc;

/// A cheap, cloneable handle to a running job system.
///
/// Jobs receive one through [`JobSystem::run_with_context`] and can use it
/// to submit sub-batches and wait on them. Waiting from a job suspends the
/// job's fiber instead of blocking its worker thread.
///
/// [`JobSystem::run_with_context`]: crate::JobSystem::run_with_context
#[derive(Clone)]
pub struct Context {
    scheduler: Arc<Scheduler>,
}

impl Context {
    pub(crate) fn new(scheduler: Arc<Scheduler>) -> Self {
        Context { scheduler }
    }

    /// Submits a batch of jobs, adding the batch size to `counter` first.
    ///
    /// Pass `None` for fire-and-forget jobs nobody will wait on.
    ///
    /// # Panics
    ///
    /// Panics if `jobs` is empty.
    pub fn run_jobs<I>(&self, jobs: I, counter: Option<&Counter>)
    where
        I: IntoIterator<Item = JobDecl>,
    {
        self.scheduler.submit(jobs, counter);
    }

    /// Waits until `counter` has no outstanding jobs.
    pub fn wait(&self, counter: &Counter) {
        self.scheduler.wait(counter);
    }

    /// Spawns a child job and returns a counter tracking it.
    pub fn spawn_job<F>(&self, work: F) -> Counter
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        let counter = Counter::new();
        self.spawn_internal(work, Some(&counter));
        counter
    }

    /// Spawns a job that shares an existing counter.
    /// Useful for grouping multiple jobs under a single synchronization primitive.
    pub fn spawn_with_counter<F>(&self, work: F, counter: &Counter)
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        self.spawn_internal(work, Some(counter));
    }

    /// Spawns a job without a counter (fire-and-forget).
    pub fn spawn_detached<F>(&self, work: F)
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        self.spawn_internal(work, None);
    }

    /// Spawns a batch of context jobs under one counter.
    pub fn spawn_jobs<I>(&self, jobs: I) -> Counter
    where
        I: IntoIterator<Item = Box<dyn FnOnce(&Context) + Send + 'static>>,
    {
        let counter = Counter::new();
        let decls = jobs.into_iter().map(|work| self.bind(work));
        self.scheduler.submit(decls, Some(&counter));
        counter
    }

    fn spawn_internal<F>(&self, work: F, counter: Option<&Counter>)
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        self.scheduler.submit([self.bind(work)], counter);
    }

    /// Turns a context job into a plain job carrying its own handle.
    pub(crate) fn bind<F>(&self, work: F) -> JobDecl
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        let ctx = self.clone();
        JobDecl::new(move || work(&ctx))
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
