//! Worker thread implementation.
//!
//! Each worker thread runs the scheduling loop on its own stack (the
//! primary context) and switches into pooled fibers to run jobs. This is
//! the M:N model: many jobs multiplexed onto a fixed number of threads.

use crate::PinningStrategy;
use crate::error::JobSystemError;
use crate::scheduler::Scheduler;
use core_affinity::CoreId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A worker thread that executes jobs from the shared queue.
pub struct Worker {
    id: usize,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a worker thread, optionally pinned to `core`.
    pub(crate) fn spawn(
        id: usize,
        scheduler: Arc<Scheduler>,
        core: Option<CoreId>,
    ) -> std::io::Result<Self> {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let handle = thread::Builder::new()
            .name(format!("fiberjobs-worker-{id}"))
            .spawn(move || {
                let span = tracing::debug_span!("worker", id);
                let _enter = span.enter();

                if let Some(core) = core {
                    if core_affinity::set_for_current(core) {
                        tracing::trace!(core = core.id, "pinned");
                    } else {
                        tracing::debug!(core = core.id, "failed to pin worker thread");
                    }
                }

                Worker::run_loop(&scheduler, &flag);
                tracing::debug!("worker exited");
            })?;

        Ok(Worker {
            id,
            finished,
            handle: Some(handle),
        })
    }

    /// Main scheduling loop: resume a ready fiber, else start a new job,
    /// else sleep briefly on the work event.
    ///
    /// The finished flag is only checked between fiber switches, so a job
    /// that is running when shutdown starts runs to completion.
    fn run_loop(scheduler: &Scheduler, finished: &AtomicBool) {
        while !finished.load(Ordering::Acquire) {
            match scheduler.next_work() {
                Some(work) => scheduler.execute(work),
                None => {
                    scheduler.wait_for_work();
                }
            }
        }
    }

    /// Returns the worker's ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Asks the worker to leave its loop at the next opportunity.
    pub fn request_finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the worker thread to finish.
    pub fn join(mut self) -> thread::Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.join()
        } else {
            Ok(())
        }
    }
}

/// The set of worker threads serving one scheduler.
pub struct WorkerPool {
    workers: Vec<Worker>,
    scheduler: Arc<Scheduler>,
}

impl WorkerPool {
    /// Spawns `num_threads` workers pinned according to `strategy`.
    ///
    /// Workers that fail to spawn are logged and skipped; the pool only
    /// fails if none could be started.
    pub(crate) fn start(
        scheduler: Arc<Scheduler>,
        num_threads: usize,
        strategy: PinningStrategy,
    ) -> Result<Self, JobSystemError> {
        let cores = pinning_cores(strategy);
        let mut workers = Vec::with_capacity(num_threads);

        for id in 0..num_threads {
            let core = (!cores.is_empty()).then(|| cores[id % cores.len()]);
            match Worker::spawn(id, Arc::clone(&scheduler), core) {
                Ok(worker) => workers.push(worker),
                Err(err) => tracing::warn!(id, error = %err, "failed to start worker thread"),
            }
        }

        if workers.is_empty() {
            return Err(JobSystemError::NoWorkersStarted);
        }

        tracing::info!(
            workers = workers.len(),
            requested = num_threads,
            ?strategy,
            "worker pool started"
        );
        Ok(WorkerPool { workers, scheduler })
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stops every worker and waits for the threads to exit.
    ///
    /// Returns `Err` with the number of workers that panicked.
    pub fn shutdown(self) -> Result<(), JobSystemError> {
        for worker in &self.workers {
            worker.request_finish();
        }

        // Idle workers only notice the flag when they wake up.
        for worker in &self.workers {
            while !worker.is_finished() {
                self.scheduler.wake_workers();
                thread::sleep(Duration::from_micros(100));
            }
        }

        let mut failed_count = 0;
        for worker in self.workers {
            let worker_id = worker.id();
            if worker.join().is_err() {
                failed_count += 1;
                tracing::error!(worker_id, "worker panicked during execution");
            }
        }

        tracing::info!("worker pool stopped");
        if failed_count > 0 {
            Err(JobSystemError::WorkerPanicked(failed_count))
        } else {
            Ok(())
        }
    }
}

/// Cores to pin workers to, in assignment order. Empty means no pinning.
fn pinning_cores(strategy: PinningStrategy) -> Vec<CoreId> {
    if strategy == PinningStrategy::None {
        return Vec::new();
    }

    let Some(core_ids) = core_affinity::get_core_ids() else {
        tracing::debug!("CPU affinity unsupported, workers left unpinned");
        return Vec::new();
    };

    match strategy {
        PinningStrategy::None => Vec::new(),
        PinningStrategy::Linear => core_ids,
        // Even logical processors, one per physical core on common SMT layouts.
        PinningStrategy::AvoidSMT => {
            let physical: Vec<CoreId> = core_ids.iter().copied().filter(|c| c.id % 2 == 0).collect();
            if physical.is_empty() { core_ids } else { physical }
        }
    }
}
