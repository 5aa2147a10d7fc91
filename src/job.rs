//! Job definitions and execution logic.
//!
//! Jobs are units of work that can be executed by the fiber system.
//! A [`JobDecl`] is what callers submit; the scheduler pairs it with the
//! batch counter to form a [`Job`].

use crate::counter::Counter;

/// A one-shot unit of work as submitted by callers.
pub struct JobDecl {
    work: Box<dyn FnOnce() + Send + 'static>,
}

impl JobDecl {
    /// Creates a new job declaration from the given work function.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        JobDecl {
            work: Box::new(work),
        }
    }
}

impl<F> From<F> for JobDecl
where
    F: FnOnce() + Send + 'static,
{
    fn from(work: F) -> Self {
        JobDecl::new(work)
    }
}

impl std::fmt::Debug for JobDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JobDecl")
    }
}

/// A unit of work to be executed by the job system.
///
/// Jobs consist of a closure to execute and an optional counter
/// that is decremented upon completion.
pub struct Job {
    decl: JobDecl,
    counter: Option<Counter>,
}

impl Job {
    /// Pairs a declaration with the counter of its batch.
    pub fn new(decl: JobDecl, counter: Option<Counter>) -> Self {
        Job { decl, counter }
    }

    /// Executes the job and decrements its counter if present.
    ///
    /// The decrement happens exactly once, even if the job body panics.
    pub fn execute(self) {
        let _guard = CounterGuard(self.counter);
        (self.decl.work)();
    }
}

/// Decrements the counter on drop, so unwinding job bodies still count.
struct CounterGuard(Option<Counter>);

impl Drop for CounterGuard {
    fn drop(&mut self) {
        if let Some(counter) = &self.0 {
            counter.decrement();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_job_execution() {
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        let job = Job::new(
            JobDecl::new(move || {
                executed_clone.store(true, Ordering::SeqCst);
            }),
            None,
        );

        job.execute();
        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_job_with_counter() {
        let counter = Counter::with_value(1);
        let job = Job::new(JobDecl::from(|| {}), Some(counter.clone()));

        assert_eq!(counter.value(), 1);
        job.execute();
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn test_panicking_job_still_decrements() {
        let counter = Counter::with_value(1);
        let job = Job::new(JobDecl::new(|| panic!("boom")), Some(counter.clone()));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| job.execute()));
        assert!(result.is_err());
        assert!(counter.is_complete());
    }
}
