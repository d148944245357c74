//! Process-wide defaults.
//!
//! Passed explicitly into the service at construction; queue fields left
//! unset at save time resolve against this value, and unsaved queue names
//! fall back to it entirely at dequeue time.

use std::time::Duration;

/// Process-wide default configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Default per-queue concurrency limit.
    pub concurrency: u32,

    /// Default max additional attempts after the first failure.
    pub max_retries: u32,

    /// Default lease validity window.
    pub lease_duration: Duration,

    /// Default delay before a failed job becomes eligible again
    /// (zero: straight back to Queued).
    pub retry_backoff: Duration,

    /// Jobs returned by a dequeue that asked for `num = 0`.
    pub dequeue_num: usize,

    /// Lease monitor wake interval.
    pub sweep_interval: Duration,

    /// Max jobs reclaimed per sweep pass.
    pub sweep_batch: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_retries: 3,
            lease_duration: Duration::from_secs(10 * 60),
            retry_backoff: Duration::ZERO,
            dequeue_num: 1,
            sweep_interval: Duration::from_secs(1),
            sweep_batch: 100,
        }
    }
}
