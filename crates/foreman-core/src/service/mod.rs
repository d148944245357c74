//! Service layer: the request/response contract the transport glue calls.
//!
//! One facade, [`JobService`], split across modules by concern:
//! - enqueue: admission of new jobs
//! - dequeue: lease scheduling under concurrency limits
//! - ack: terminal/retry transitions reported by workers
//! - registry: queue configuration upserts and listing
//! - sweep: reclamation pass driven by the lease monitor

mod ack;
mod dequeue;
mod enqueue;
mod registry;
mod sweep;

pub use ack::{AckRequest, AckStatus};
pub use sweep::SweepStats;

use std::sync::Arc;

use crate::config::Defaults;
use crate::domain::{Job, JobId, QueueConfig};
use crate::error::Error;
use crate::ports::store::JobCounts;
use crate::ports::{Clock, JobStore};

/// The job queue core.
///
/// Owns no job state: the store is the single source of truth, the clock
/// is injected so lease expiry is testable, and defaults are an explicit
/// immutable value rather than process globals.
pub struct JobService {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    defaults: Defaults,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>, defaults: Defaults) -> Self {
        Self {
            store,
            clock,
            defaults,
        }
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Fetch one job. `JobNotFound` if unknown.
    pub async fn get_job(&self, id: JobId) -> Result<Job, Error> {
        self.store.get_job(id).await
    }

    /// Job counts by status, optionally restricted to one queue.
    pub async fn counts(&self, queue: Option<&str>) -> Result<JobCounts, Error> {
        self.store.counts(queue).await
    }

    /// Saved config for `name`, or an all-defaults fallback for a queue
    /// that was enqueued to but never saved.
    pub(crate) async fn resolved_queue(&self, name: &str) -> Result<QueueConfig, Error> {
        Ok(self
            .store
            .get_queue(name)
            .await?
            .unwrap_or_else(|| QueueConfig::fallback(name, &self.defaults)))
    }

    pub(crate) fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
