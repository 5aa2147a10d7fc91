//! Fiber management and execution context.
//!
//! A fiber is a stackful coroutine that runs jobs. Fibers are reused: the
//! coroutine body is a trampoline that runs one job, hands control back to
//! the worker, and waits to be started again with the next job.

use crate::counter::Counter;
use crate::error::JobSystemError;
use crate::job::Job;
use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};
use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a fiber hands back to its worker when it switches out.
///
/// `None` means the job finished and the fiber is free again.
/// `Some(counter)` means the job is suspended until `counter <= 0`.
pub type SwitchState = Option<Counter>;

/// Value passed into a fiber when a worker switches to it.
pub enum FiberInput {
    /// Begin executing a fresh job from the start.
    Start(Job),
    /// Continue a suspended job after its counter was satisfied.
    Resume,
}

type FiberYielder = Yielder<FiberInput, SwitchState>;

thread_local! {
    // Set while a job fiber runs on this thread, null on the worker's own
    // stack and on threads that never run fibers.
    static CURRENT_YIELDER: Cell<*const FiberYielder> = const { Cell::new(std::ptr::null()) };
}

// Fibers migrate between threads, so the thread-local must be re-read
// after every switch. Keeping these out of line stops the compiler from
// caching the TLS address across a suspension point.
#[inline(never)]
fn set_current_yielder(yielder: *const FiberYielder) {
    CURRENT_YIELDER.with(|cell| cell.set(yielder));
}

#[inline(never)]
fn current_yielder() -> *const FiberYielder {
    CURRENT_YIELDER.with(|cell| cell.get())
}

/// Returns true when called from code running on a job fiber.
pub fn in_job_fiber() -> bool {
    !current_yielder().is_null()
}

/// Suspends the current job fiber until `counter` reaches zero.
///
/// Control returns once a worker has found the counter satisfied and
/// resumed this fiber, possibly on another OS thread.
///
/// # Panics
///
/// Panics if called outside a job fiber.
pub(crate) fn suspend_until(counter: &Counter) {
    let yielder = current_yielder();
    assert!(!yielder.is_null(), "suspend_until called outside a job fiber");

    // SAFETY: the yielder lives on this fiber's stack for as long as the
    // coroutine exists, and we are running on that fiber right now.
    let yielder = unsafe { &*yielder };
    yielder.suspend(Some(counter.clone()));
    set_current_yielder(yielder);
}

/// Represents a fiber - a lightweight stackful execution context.
///
/// Uses `corosensei` for context switching.
pub struct Fiber {
    coroutine: Coroutine<FiberInput, SwitchState, (), DefaultStack>,
    /// Set before the coroutine is dropped so a forced unwind of a
    /// suspended job is not mistaken for a job panic.
    teardown: Arc<AtomicBool>,
}

// SAFETY: a fiber is only ever resumed by the one worker that owns its
// pool slot, so the coroutine is never touched by two threads at once.
unsafe impl Send for Fiber {}

impl Fiber {
    /// Creates a new fiber with the given stack size.
    pub fn new(stack_size: usize) -> Result<Self, JobSystemError> {
        let stack = DefaultStack::new(stack_size).map_err(|source| {
            JobSystemError::StackAllocation {
                size: stack_size,
                source,
            }
        })?;

        let teardown = Arc::new(AtomicBool::new(false));
        let tearing_down = teardown.clone();

        let coroutine: Coroutine<FiberInput, SwitchState, (), DefaultStack> =
            Coroutine::with_stack(stack, move |yielder: &FiberYielder, mut input: FiberInput| {
                loop {
                    if let FiberInput::Start(job) = input {
                        set_current_yielder(yielder);

                        let result = catch_unwind(AssertUnwindSafe(move || job.execute()));
                        if let Err(payload) = result {
                            if tearing_down.load(Ordering::Acquire) {
                                resume_unwind(payload);
                            }
                            tracing::error!(panic = panic_message(&*payload), "job panicked");
                        }
                    }

                    input = yielder.suspend(None);
                }
            });

        Ok(Fiber {
            coroutine,
            teardown,
        })
    }

    /// Switches into the fiber and runs it until it finishes its job or
    /// suspends on a counter.
    pub fn resume(&mut self, input: FiberInput) -> SwitchState {
        let result = self.coroutine.resume(input);
        set_current_yielder(std::ptr::null());

        match result {
            CoroutineResult::Yield(state) => state,
            CoroutineResult::Return(()) => None,
        }
    }
}

impl Drop for Fiber {
    fn drop(&mut self) {
        self.teardown.store(true, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
