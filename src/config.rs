//! Configuration for the job system.
//!
//! Every field has a default, so partial configs deserialize cleanly and
//! `JobSystemConfig::default()` matches the stock setup: one worker per
//! logical CPU minus one, 256 fibers of 256 KiB each.

use crate::PinningStrategy;
use crate::error::JobSystemError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of pooled fibers.
pub const DEFAULT_POOL_CAPACITY: usize = 256;
/// Default fiber stack size in bytes.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

const MIN_STACK_SIZE: usize = 16 * 1024;

/// Configuration for the fiber pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiberConfig {
    /// Stack size for each fiber in bytes. Default: 256KB.
    pub stack_size: usize,
    /// Number of fibers created at startup. The pool never grows, so this
    /// is the ceiling on jobs that are running or suspended at once.
    pub pool_capacity: usize,
}

impl Default for FiberConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Top-level job system configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSystemConfig {
    /// Worker thread count. `None` picks `max(1, cpus - 1)`.
    pub num_workers: Option<usize>,
    /// How worker threads are pinned to logical CPUs.
    pub pinning: PinningStrategy,
    pub fiber: FiberConfig,
    /// How long an idle worker sleeps before rescanning for work.
    pub idle_timeout_us: u64,
    /// Poll interval for waits issued from threads that own no fiber.
    pub outside_wait_timeout_us: u64,
}

impl Default for JobSystemConfig {
    fn default() -> Self {
        Self {
            num_workers: None,
            pinning: PinningStrategy::Linear,
            fiber: FiberConfig::default(),
            idle_timeout_us: 1_000,
            outside_wait_timeout_us: 1_000,
        }
    }
}

impl JobSystemConfig {
    /// Config with an explicit worker count and defaults elsewhere.
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers: Some(num_workers),
            ..Self::default()
        }
    }

    /// Resolved worker count.
    pub fn worker_count(&self) -> usize {
        self.num_workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_micros(self.idle_timeout_us.max(1))
    }

    pub fn outside_wait_timeout(&self) -> Duration {
        Duration::from_micros(self.outside_wait_timeout_us.max(1))
    }

    /// Builds a config from `FIBERJOBS_*` environment variables.
    pub fn from_env() -> Result<Self, JobSystemError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, starting from defaults.
    ///
    /// Recognized keys: `FIBERJOBS_WORKERS`, `FIBERJOBS_PINNING`,
    /// `FIBERJOBS_STACK_SIZE`, `FIBERJOBS_POOL_CAPACITY`,
    /// `FIBERJOBS_IDLE_TIMEOUT_US`, `FIBERJOBS_OUTSIDE_WAIT_TIMEOUT_US`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, JobSystemError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("FIBERJOBS_WORKERS") {
            config.num_workers = Some(parse_number("FIBERJOBS_WORKERS", &value)?);
        }
        if let Some(value) = lookup("FIBERJOBS_PINNING") {
            config.pinning = value
                .parse()
                .map_err(|_| JobSystemError::InvalidConfig {
                    key: "FIBERJOBS_PINNING",
                    value,
                })?;
        }
        if let Some(value) = lookup("FIBERJOBS_STACK_SIZE") {
            config.fiber.stack_size = parse_number("FIBERJOBS_STACK_SIZE", &value)?;
        }
        if let Some(value) = lookup("FIBERJOBS_POOL_CAPACITY") {
            config.fiber.pool_capacity = parse_number("FIBERJOBS_POOL_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("FIBERJOBS_IDLE_TIMEOUT_US") {
            config.idle_timeout_us = parse_number("FIBERJOBS_IDLE_TIMEOUT_US", &value)?;
        }
        if let Some(value) = lookup("FIBERJOBS_OUTSIDE_WAIT_TIMEOUT_US") {
            config.outside_wait_timeout_us =
                parse_number("FIBERJOBS_OUTSIDE_WAIT_TIMEOUT_US", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), JobSystemError> {
        if self.num_workers == Some(0) {
            return Err(JobSystemError::InvalidConfig {
                key: "num_workers",
                value: "0".into(),
            });
        }
        if self.fiber.pool_capacity == 0 || self.fiber.pool_capacity > u32::MAX as usize {
            return Err(JobSystemError::InvalidConfig {
                key: "fiber.pool_capacity",
                value: self.fiber.pool_capacity.to_string(),
            });
        }
        if self.fiber.stack_size < MIN_STACK_SIZE {
            return Err(JobSystemError::InvalidConfig {
                key: "fiber.stack_size",
                value: self.fiber.stack_size.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, JobSystemError> {
    value
        .trim()
        .parse()
        .map_err(|_| JobSystemError::InvalidConfig {
            key,
            value: value.to_string(),
        })
}
