//! Process-wide job system.
//!
//! A thin layer over one [`JobSystem`] kept in a lazily created slot, for
//! code that wants `init` / `run_jobs` / `wait` / `shutdown` without
//! threading a handle around. Calls only hold the slot lock long enough to
//! clone a [`Context`] out of it. `shutdown` empties the slot before joining
//! the workers, so a job still running at that point does not deadlock on
//! the lock, but from then on the global API is unavailable to it:
//! `run_jobs` panics and `wait` panics unless the counter is complete.
//! Jobs that must keep submitting during shutdown should hold a [`Context`].

use crate::config::JobSystemConfig;
use crate::context::Context;
use crate::counter::Counter;
use crate::job::JobDecl;
use crate::job_system::JobSystem;
use parking_lot::RwLock;

lazy_static::lazy_static! {
    static ref SYSTEM: RwLock<Option<JobSystem>> = RwLock::new(None);
}

/// Starts the process-wide job system with the default configuration.
///
/// Does nothing and returns `true` if it is already running. Otherwise
/// returns whether at least one worker thread started.
pub fn init() -> bool {
    init_with_config(JobSystemConfig::default())
}

/// Starts the process-wide job system with `config`.
pub fn init_with_config(config: JobSystemConfig) -> bool {
    let mut slot = SYSTEM.write();
    if slot.is_some() {
        return true;
    }

    match JobSystem::with_config(config) {
        Ok(system) => {
            *slot = Some(system);
            true
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize job system");
            false
        }
    }
}

/// Stops the process-wide job system. Does nothing if it is not running.
pub fn shutdown() {
    // Empty the slot before joining so running jobs never block on the lock.
    let Some(system) = SYSTEM.write().take() else {
        return;
    };
    if let Err(err) = system.shutdown() {
        tracing::error!(error = %err, "job system shutdown failed");
    }
}

pub fn is_initialized() -> bool {
    SYSTEM.read().is_some()
}

/// A handle to the running process-wide system, if any.
pub fn context() -> Option<Context> {
    SYSTEM.read().as_ref().map(JobSystem::context)
}

/// Submits a batch to the process-wide system.
///
/// # Panics
///
/// Panics if the system is not initialized or `jobs` is empty.
pub fn run_jobs<I>(jobs: I, counter: Option<&Counter>)
where
    I: IntoIterator<Item = JobDecl>,
{
    expect_context().run_jobs(jobs, counter);
}

/// Waits on `counter` using the process-wide system.
///
/// # Panics
///
/// Panics if the counter is not yet complete and the system is not
/// initialized.
pub fn wait(counter: &Counter) {
    if counter.is_complete() {
        return;
    }
    expect_context().wait(counter);
}

fn expect_context() -> Context {
    context().unwrap_or_else(|| panic!("job system used before fiberjobs::global::init"))
}
