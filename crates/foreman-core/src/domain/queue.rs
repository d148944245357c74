//! Queue configuration: spec (as submitted) and resolved config (as stored).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::Defaults;

/// Queue configuration as submitted to `save_queue`.
///
/// Unset fields resolve from process-wide [`Defaults`] at save time
/// (upsert echoes the resolved config back).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    pub concurrency: Option<u32>,
    pub max_retries: Option<u32>,
    pub lease_duration: Option<Duration>,
    pub retry_backoff: Option<Duration>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl QueueSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Fill unset fields from defaults.
    pub fn resolve(self, defaults: &Defaults) -> QueueConfig {
        QueueConfig {
            name: self.name,
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            lease_duration: self.lease_duration.unwrap_or(defaults.lease_duration),
            retry_backoff: self.retry_backoff.unwrap_or(defaults.retry_backoff),
            labels: self.labels,
        }
    }
}

/// Fully-resolved queue configuration.
///
/// This is what the registry stores and what the dequeue scheduler and
/// lease monitor read. An unsaved queue name resolves to
/// [`QueueConfig::fallback`] at dequeue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,

    /// Max simultaneously leased jobs for this queue.
    pub concurrency: u32,

    /// Max additional attempts after the first failure.
    pub max_retries: u32,

    /// Time window a lease remains valid before reclamation.
    pub lease_duration: Duration,

    /// Delay before a failed job becomes eligible again. Zero means the
    /// job returns straight to Queued.
    pub retry_backoff: Duration,

    pub labels: BTreeSet<String>,
}

impl QueueConfig {
    /// Config for a queue that was never saved: all fields from defaults.
    pub fn fallback(name: impl Into<String>, defaults: &Defaults) -> Self {
        QueueSpec::named(name).resolve(defaults)
    }

    /// Max leases a job may consume before it is terminally failed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether any of `selectors` appears in this queue's labels.
    pub fn matches_selectors(&self, selectors: &[String]) -> bool {
        selectors.iter().any(|s| self.labels.contains(s))
    }
}
