//! Counter-based synchronization primitives for job completion tracking.

use crossbeam::utils::CachePadded;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// A shared dependency counter.
///
/// `run_jobs` adds the batch size before any job of the batch becomes
/// visible, and each finished job subtracts one. A value `<= 0` means the
/// batch has no outstanding jobs. Clones refer to the same counter.
///
/// Reusing one counter for several batches is fine as long as the caller
/// does not start a new batch while someone still waits on the old one.
#[derive(Clone, Default)]
pub struct Counter {
    inner: Arc<CachePadded<AtomicI32>>,
}

impl Counter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::with_value(0)
    }

    /// Creates a counter with the specified initial value.
    pub fn with_value(initial: i32) -> Self {
        Counter {
            inner: Arc::new(CachePadded::new(AtomicI32::new(initial))),
        }
    }

    /// Atomically adds `count` and returns the new value.
    ///
    /// # Panics
    ///
    /// Panics if the counter would overflow `i32`.
    pub fn add(&self, count: i32) -> i32 {
        match self
            .inner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| current.checked_add(count))
        {
            Ok(previous) => previous + count,
            Err(current) => panic!("counter overflow: {current} + {count} exceeds i32::MAX"),
        }
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Decrements the counter by one.
    ///
    /// Returns true if the counter reached zero (or below).
    pub fn decrement(&self) -> bool {
        // The finished job's writes must be visible to whoever observes
        // the counter hitting zero.
        self.inner.fetch_sub(1, Ordering::AcqRel) <= 1
    }

    /// Returns the current value of the counter.
    pub fn value(&self) -> i32 {
        self.inner.load(Ordering::Acquire)
    }

    /// Checks if the counter has no outstanding jobs.
    pub fn is_complete(&self) -> bool {
        self.value() <= 0
    }

    /// Whether both handles refer to the same counter.
    pub fn ptr_eq(&self, other: &Counter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Counter").field(&self.value()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::with_value(5);
        assert_eq!(counter.value(), 5);
        assert!(!counter.is_complete());

        counter.decrement();
        assert_eq!(counter.value(), 4);

        counter.increment();
        assert_eq!(counter.value(), 5);
    }

    #[test]
    fn test_counter_completion() {
        let counter = Counter::new();
        assert!(counter.is_complete());

        assert_eq!(counter.add(1), 1);
        assert!(!counter.is_complete());

        assert!(counter.decrement());
        assert!(counter.is_complete());
    }

    #[test]
    fn test_negative_counts_as_complete() {
        let counter = Counter::new();
        counter.decrement();
        assert_eq!(counter.value(), -1);
        assert!(counter.is_complete());
    }

    #[test]
    fn test_clones_share_state() {
        let counter = Counter::new();
        let other = counter.clone();
        other.add(3);
        assert_eq!(counter.value(), 3);
        assert!(counter.ptr_eq(&other));
        assert!(!counter.ptr_eq(&Counter::new()));
    }

    #[test]
    #[should_panic(expected = "counter overflow")]
    fn test_accumulated_batches_overflow_panics() {
        let counter = Counter::with_value(i32::MAX - 10);
        counter.add(8);
        counter.add(8);
    }

    #[test]
    fn test_failed_add_leaves_value_untouched() {
        let counter = Counter::with_value(i32::MAX - 1);
        let other = counter.clone();
        let result = std::panic::catch_unwind(move || other.add(2));
        assert!(result.is_err());
        assert_eq!(counter.value(), i32::MAX - 1);
    }
}
