//! Fixed-capacity pool of reusable fibers.
//!
//! Fibers live in an arena and are addressed by [`FiberIndex`]. Which
//! slots are free is tracked separately by a [`FreeList`] that the
//! scheduler keeps under its global lock, next to the job queue and the
//! sleeping set.

use crate::error::JobSystemError;
use crate::fiber::{Fiber, FiberInput, SwitchState};
use parking_lot::Mutex;

/// Handle to one slot of the fiber arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberIndex(u32);

impl FiberIndex {
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// An arena of pre-created fibers.
///
/// Each slot has its own lock, taken only by the worker that currently
/// owns the slot while it runs the fiber. Ownership itself is handed out
/// through the [`FreeList`] and the sleeping set, so the slot lock is
/// never contended; contention means the ownership protocol was broken.
pub struct FiberPool {
    slots: Box<[Mutex<Option<Fiber>>]>,
}

impl FiberPool {
    /// Creates the pool with every fiber allocated up front.
    pub fn new(capacity: usize, stack_size: usize) -> Result<Self, JobSystemError> {
        let slots = (0..capacity)
            .map(|_| Fiber::new(stack_size).map(|fiber| Mutex::new(Some(fiber))))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(capacity, stack_size, "fiber pool created");

        Ok(FiberPool {
            slots: slots.into_boxed_slice(),
        })
    }

    /// Total number of fibers in the pool.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Runs the fiber in `index` until it finishes or suspends.
    ///
    /// # Panics
    ///
    /// Panics if another worker is running the same slot, or if the pool
    /// has already been destroyed.
    pub fn resume(&self, index: FiberIndex, input: FiberInput) -> SwitchState {
        let mut slot = self.slots[index.get()]
            .try_lock()
            .unwrap_or_else(|| panic!("fiber slot {} is owned by another worker", index.get()));
        let fiber = slot
            .as_mut()
            .unwrap_or_else(|| panic!("fiber slot {} was destroyed", index.get()));
        fiber.resume(input)
    }

    /// Drops every fiber. Suspended jobs are unwound.
    pub fn destroy_all(&self) {
        let mut destroyed = 0usize;
        for slot in self.slots.iter() {
            if slot.lock().take().is_some() {
                destroyed += 1;
            }
        }
        tracing::debug!(destroyed, "fiber pool destroyed");
    }
}

/// The set of fiber slots not currently running or suspended.
pub struct FreeList {
    free: Vec<FiberIndex>,
    capacity: usize,
}

impl FreeList {
    /// A free list in which every one of `capacity` slots is available.
    pub fn full(capacity: usize) -> Self {
        let capacity_u32 = u32::try_from(capacity).unwrap_or(u32::MAX);
        // Reverse so slot 0 is handed out first.
        let free = (0..capacity_u32).rev().map(FiberIndex).collect();
        FreeList { free, capacity }
    }

    /// Takes one free slot, or `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<FiberIndex> {
        self.free.pop()
    }

    /// Returns a slot to the pool.
    pub fn release(&mut self, index: FiberIndex) {
        debug_assert!(index.get() < self.capacity, "fiber index out of range");
        debug_assert!(!self.free.contains(&index), "fiber slot released twice");
        self.free.push(index);
    }

    /// Number of free slots.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::Counter;
    use crate::job::{Job, JobDecl};

    #[test]
    fn test_free_list_acquire_release() {
        let mut free = FreeList::full(3);
        assert_eq!(free.len(), 3);

        let a = free.acquire().unwrap();
        let b = free.acquire().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.get(), 0);
        assert_eq!(free.len(), 1);

        free.release(a);
        free.release(b);
        assert_eq!(free.len(), 3);
    }

    #[test]
    fn test_free_list_exhaustion() {
        let mut free = FreeList::full(2);
        assert!(free.acquire().is_some());
        assert!(free.acquire().is_some());
        assert!(free.acquire().is_none());
        assert!(free.is_empty());
    }

    #[test]
    fn test_pool_runs_job_in_slot() {
        let pool = FiberPool::new(2, 64 * 1024).unwrap();
        assert_eq!(pool.capacity(), 2);

        let counter = Counter::with_value(1);
        let job = Job::new(JobDecl::new(|| {}), Some(counter.clone()));
        let state = pool.resume(FreeList::full(2).acquire().unwrap(), FiberInput::Start(job));

        assert!(state.is_none());
        assert!(counter.is_complete());
    }

    #[test]
    #[should_panic(expected = "was destroyed")]
    fn test_resume_after_destroy_panics() {
        let pool = FiberPool::new(1, 64 * 1024).unwrap();
        pool.destroy_all();
        let job = Job::new(JobDecl::new(|| {}), None);
        pool.resume(FreeList::full(1).acquire().unwrap(), FiberInput::Start(job));
    }
}
