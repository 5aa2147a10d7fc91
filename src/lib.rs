//! # fiberjobs - Fiber-Based Cooperative Job Scheduler
//!
//! A fixed pool of worker threads runs a much larger number of short jobs
//! on pooled fibers (stackful coroutines). Jobs are grouped into batches
//! tracked by a shared [`Counter`], and any job can wait on a counter
//! without blocking its OS thread: the waiting fiber is parked and the
//! worker moves on to other jobs until the counter reaches zero.
//!
//! ## Architecture
//!
//! - **Fibers**: reusable execution contexts, suspended only inside `wait`
//! - **Fiber Pool**: fixed-capacity arena of fibers with a free list
//! - **Job Queue**: LIFO queue of pending jobs plus a "work available" event
//! - **Sleeping Fibers**: fibers parked on a counter, resumed once it hits zero
//! - **Worker Threads**: OS threads running the scheduling loop
//!
//! ## Example
//!
//! ```no_run
//! use fiberjobs::{Counter, JobDecl, JobSystem};
//!
//! let job_system = JobSystem::new(4).unwrap();
//!
//! let counter = Counter::new();
//! job_system.run_jobs(
//!     (0..3).map(|i| JobDecl::new(move || println!("Hello from job {i}"))),
//!     Some(&counter),
//! );
//!
//! job_system.wait(&counter);
//! job_system.shutdown().unwrap();
//! ```

pub mod config;
pub mod context;
pub mod counter;
pub mod error;
pub mod event;
pub mod fiber;
pub mod fiber_pool;
pub mod global;
pub mod job;
pub mod job_system;
pub mod metrics;
pub mod queue;
mod scheduler;
pub mod worker;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strategy for pinning worker threads to CPU cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinningStrategy {
    /// No pinning (standard OS scheduling).
    None,
    /// Linear pinning (worker i -> logical processor i).
    #[default]
    Linear,
    /// Pin to even-numbered logical processors only, avoiding SMT siblings.
    #[serde(rename = "avoid_smt")]
    AvoidSMT,
}

impl FromStr for PinningStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(PinningStrategy::None),
            "linear" => Ok(PinningStrategy::Linear),
            "avoid_smt" | "avoidsmt" => Ok(PinningStrategy::AvoidSMT),
            other => Err(format!("unknown pinning strategy {other:?}")),
        }
    }
}

pub use config::{FiberConfig, JobSystemConfig};
pub use context::Context;
pub use counter::Counter;
pub use error::JobSystemError;
pub use fiber::in_job_fiber;
pub use job::JobDecl;
pub use job_system::JobSystem;
