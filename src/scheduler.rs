//! Shared scheduling state.
//!
//! One lock guards the fiber free list, the job queue and the sleeping
//! set. Critical sections are list operations only; job bodies always run
//! outside the lock.

use crate::config::JobSystemConfig;
use crate::counter::Counter;
use crate::error::JobSystemError;
use crate::event::Event;
use crate::fiber::{self, FiberInput, SwitchState};
use crate::fiber_pool::{FiberIndex, FiberPool, FreeList};
use crate::job::{Job, JobDecl};
use crate::queue::{JobQueue, SleepingFibers};
use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::Metrics;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

struct SchedState {
    free: FreeList,
    queue: JobQueue,
    sleeping: SleepingFibers,
}

/// Work picked by a worker for its next fiber switch.
pub enum Work {
    /// A parked fiber whose counter is now satisfied.
    Resume(FiberIndex),
    /// A fresh job and the free fiber it will run on.
    Start(FiberIndex, Job),
}

/// Scheduling core shared by workers and every submitting thread.
pub struct Scheduler {
    state: Mutex<SchedState>,
    work_available: Event,
    fibers: FiberPool,
    idle_timeout: Duration,
    outside_wait_timeout: Duration,
    #[cfg(feature = "metrics")]
    metrics: Metrics,
}

impl Scheduler {
    /// Creates the scheduler and its full fiber pool.
    pub fn new(config: &JobSystemConfig) -> Result<Self, JobSystemError> {
        config.validate()?;
        let fibers = FiberPool::new(config.fiber.pool_capacity, config.fiber.stack_size)?;

        Ok(Scheduler {
            state: Mutex::new(SchedState {
                free: FreeList::full(fibers.capacity()),
                queue: JobQueue::new(),
                sleeping: SleepingFibers::new(),
            }),
            work_available: Event::new(),
            fibers,
            idle_timeout: config.idle_timeout(),
            outside_wait_timeout: config.outside_wait_timeout(),
            #[cfg(feature = "metrics")]
            metrics: Metrics::new(),
        })
    }

    /// Queues a batch of jobs against `counter`.
    ///
    /// The counter is raised by the batch size before any job of the batch
    /// can run, so a concurrent `wait` never sees it drop to zero early.
    ///
    /// # Panics
    ///
    /// Panics if `jobs` is empty, holds more than `i32::MAX` jobs, or would
    /// push `counter` past `i32::MAX`.
    pub fn submit<I>(&self, jobs: I, counter: Option<&Counter>)
    where
        I: IntoIterator<Item = JobDecl>,
    {
        let jobs: Vec<JobDecl> = jobs.into_iter().collect();
        assert!(!jobs.is_empty(), "run_jobs requires at least one job");
        let count = i32::try_from(jobs.len())
            .unwrap_or_else(|_| panic!("run_jobs batch of {} jobs overflows the counter", jobs.len()));

        if let Some(counter) = counter {
            counter.add(count);
        }

        let mut state = self.state.lock();
        for decl in jobs {
            state.queue.push(Job::new(decl, counter.cloned()));
        }
        self.work_available.trigger();
        drop(state);

        #[cfg(feature = "metrics")]
        self.metrics
            .jobs_submitted
            .fetch_add(count as u64, Ordering::Relaxed);
        tracing::trace!(count, "jobs submitted");
    }

    /// Picks the next thing a worker should switch to.
    ///
    /// Ready sleeping fibers take precedence over new jobs.
    ///
    /// Aborts the process if a job is pending but every fiber is in use.
    /// The popped job could never run, and its counter would hold every
    /// waiter on it forever.
    pub fn next_work(&self) -> Option<Work> {
        let mut state = self.state.lock();

        if let Some(index) = state.sleeping.take_ready() {
            #[cfg(feature = "metrics")]
            self.metrics.fibers_resumed.fetch_add(1, Ordering::Relaxed);
            return Some(Work::Resume(index));
        }

        let job = state.queue.pop()?;
        if state.queue.is_empty() {
            self.work_available.reset();
        }

        let Some(index) = state.free.acquire() else {
            let capacity = state.free.capacity();
            drop(state);
            tracing::error!(
                capacity,
                "fiber pool exhausted: more than {capacity} jobs running or suspended at once"
            );
            eprintln!("fiberjobs: fiber pool exhausted ({capacity} fibers), aborting");
            std::process::abort();
        };
        Some(Work::Start(index, job))
    }

    /// Switches into the fiber for `work` and files it away afterwards.
    pub fn execute(&self, work: Work) {
        let (index, input) = match work {
            Work::Resume(index) => (index, FiberInput::Resume),
            Work::Start(index, job) => (index, FiberInput::Start(job)),
        };
        let switch_state = self.fibers.resume(index, input);
        self.handle_switch(index, switch_state);
    }

    /// Classifies a fiber that just switched back to its worker.
    ///
    /// A finished fiber already decremented its job's counter, so it only
    /// goes back to the free list. A suspended one is parked on the
    /// counter it is waiting for.
    fn handle_switch(&self, index: FiberIndex, switch_state: SwitchState) {
        let mut state = self.state.lock();
        match switch_state {
            None => {
                state.free.release(index);
                #[cfg(feature = "metrics")]
                self.metrics.jobs_completed.fetch_add(1, Ordering::Relaxed);
            }
            Some(counter) => {
                state.sleeping.park(index, counter);
                #[cfg(feature = "metrics")]
                self.metrics.fibers_suspended.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Sleeps until work is announced or the idle timeout passes.
    pub fn wait_for_work(&self) -> bool {
        #[cfg(feature = "metrics")]
        self.metrics.idle_waits.fetch_add(1, Ordering::Relaxed);
        self.work_available.wait_timeout(self.idle_timeout)
    }

    /// Wakes every idle worker.
    pub fn wake_workers(&self) {
        self.work_available.trigger();
    }

    /// Blocks the caller until `counter <= 0`.
    ///
    /// On a job fiber this parks the fiber and frees the worker thread for
    /// other jobs. On any other thread a helper job does the fiber wait
    /// and signals an event that the caller sleeps on.
    pub fn wait(&self, counter: &Counter) {
        if counter.is_complete() {
            return;
        }
        if fiber::in_job_fiber() {
            fiber::suspend_until(counter);
            return;
        }
        self.wait_outside(counter);
    }

    fn wait_outside(&self, counter: &Counter) {
        let done = Arc::new(Event::new());
        let signal = done.clone();
        let target = counter.clone();

        self.submit(
            [JobDecl::new(move || {
                if !target.is_complete() {
                    fiber::suspend_until(&target);
                }
                signal.trigger();
            })],
            None,
        );

        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if counter.is_complete() {
                return;
            }
            backoff.snooze();
        }

        while !counter.is_complete() {
            done.wait_timeout(self.outside_wait_timeout);
        }
    }

    /// Drops unstarted jobs and parked fibers, then destroys every fiber.
    pub fn teardown(&self) {
        let (queued, sleeping) = {
            let mut state = self.state.lock();
            (state.queue.drain(), state.sleeping.drain())
        };
        if queued > 0 || sleeping > 0 {
            tracing::warn!(queued, sleeping, "discarding unfinished work at shutdown");
        }
        self.fibers.destroy_all();
    }

    pub fn fiber_capacity(&self) -> usize {
        self.fibers.capacity()
    }

    pub fn free_fibers(&self) -> usize {
        self.state.lock().free.len()
    }

    pub fn sleeping_fibers(&self) -> usize {
        self.state.lock().sleeping.len()
    }

    pub fn queued_jobs(&self) -> usize {
        self.state.lock().queue.len()
    }

    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
