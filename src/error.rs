//! Error types for job system construction and teardown.
//!
//! Only lifecycle operations are fallible. Misuse of the scheduling API
//! (empty batches, pool exhaustion) is a programming error and panics.

use thiserror::Error;

/// Errors reported while starting or stopping a [`JobSystem`](crate::JobSystem).
#[derive(Debug, Error)]
pub enum JobSystemError {
    /// Every worker thread failed to spawn.
    #[error("no worker thread could be started")]
    NoWorkersStarted,

    /// A fiber stack could not be allocated.
    #[error("failed to allocate a {size}-byte fiber stack")]
    StackAllocation {
        size: usize,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value was out of range or could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },

    /// One or more worker threads panicked outside of a job body.
    #[error("{0} worker thread(s) panicked")]
    WorkerPanicked(usize),
}
