//! Pending jobs and parked fibers.
//!
//! Neither collection is synchronized on its own; both live inside the
//! scheduler's single lock together with the fiber free list.

use crate::counter::Counter;
use crate::fiber_pool::FiberIndex;
use crate::job::Job;

/// Pending jobs, dispatched most-recently-submitted first.
///
/// LIFO dispatch makes a job that spawns a sub-batch see that sub-batch
/// picked up before older sibling work.
#[derive(Default)]
pub struct JobQueue {
    jobs: Vec<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Removes every pending job without running it.
    pub fn drain(&mut self) -> usize {
        let dropped = self.jobs.len();
        self.jobs.clear();
        dropped
    }
}

/// A fiber parked until `waiting_on` has no outstanding jobs.
pub struct SleepingFiber {
    pub fiber: FiberIndex,
    pub waiting_on: Counter,
}

/// Fibers suspended inside `wait`.
#[derive(Default)]
pub struct SleepingFibers {
    entries: Vec<SleepingFiber>,
}

impl SleepingFibers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn park(&mut self, fiber: FiberIndex, waiting_on: Counter) {
        self.entries.push(SleepingFiber { fiber, waiting_on });
    }

    /// Removes and returns a fiber whose counter is satisfied.
    pub fn take_ready(&mut self) -> Option<FiberIndex> {
        let pos = self
            .entries
            .iter()
            .position(|entry| entry.waiting_on.is_complete())?;
        Some(self.entries.swap_remove(pos).fiber)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every parked fiber.
    pub fn drain(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber_pool::FreeList;
    use crate::job::JobDecl;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_queue_is_lifo() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = JobQueue::new();

        for id in ['A', 'B', 'C'] {
            let order = order.clone();
            queue.push(Job::new(JobDecl::new(move || order.lock().push(id)), None));
        }
        assert_eq!(queue.len(), 3);

        while let Some(job) = queue.pop() {
            job.execute();
        }
        assert_eq!(*order.lock(), vec!['C', 'B', 'A']);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_drain_does_not_run_jobs() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut queue = JobQueue::new();
        for _ in 0..4 {
            let ran = ran.clone();
            queue.push(Job::new(
                JobDecl::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                }),
                None,
            ));
        }

        assert_eq!(queue.drain(), 4);
        assert!(queue.is_empty());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_sleeping_take_ready_only_returns_satisfied() {
        let mut free = FreeList::full(2);
        let a = free.acquire().unwrap();
        let b = free.acquire().unwrap();

        let pending = Counter::with_value(1);
        let done = Counter::new();

        let mut sleeping = SleepingFibers::new();
        sleeping.park(a, pending.clone());
        sleeping.park(b, done);

        assert_eq!(sleeping.take_ready(), Some(b));
        assert_eq!(sleeping.take_ready(), None);
        assert_eq!(sleeping.len(), 1);

        pending.decrement();
        assert_eq!(sleeping.take_ready(), Some(a));
        assert!(sleeping.is_empty());
    }
}
