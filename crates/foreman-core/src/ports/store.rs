//! JobStore port - the durable source of truth for jobs and queues.
//!
//! Design principles:
//! - Every status transition is the unit of atomicity. Single-job updates
//!   go through [`JobStore::compare_and_swap`] keyed on the record version;
//!   multi-job lease grants go through [`JobStore::claim`], which the store
//!   must execute as one atomic step so concurrent callers can neither
//!   double-lease a job nor jointly exceed a queue's concurrency limit.
//! - The core holds no job state of its own; everything is reconstructable
//!   from the store.
//!
//! The in-memory implementation lives in [`crate::store::memory`]; a
//! durable backend is an external collaborator implementing this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Job, JobId, QueueConfig};
use crate::error::Error;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert new jobs, all-or-nothing.
    async fn insert_jobs(&self, jobs: Vec<Job>) -> Result<(), Error>;

    /// Fetch one job. `JobNotFound` if unknown.
    async fn get_job(&self, id: JobId) -> Result<Job, Error>;

    /// Atomically lease up to `max` eligible jobs from the given queues.
    ///
    /// Eligible means Queued, or Retrying with its backoff elapsed at
    /// `now`. Selection is FIFO by enqueue time, ties broken by id, merged
    /// across queues. Per queue, no more jobs are granted than
    /// `concurrency - currently leased`. Each grant increments `attempt`
    /// and stamps `lease_expiry = now + queue.lease_duration`.
    ///
    /// Returns the leased jobs (possibly fewer than `max`, possibly none).
    async fn claim(
        &self,
        queues: &[QueueConfig],
        now: DateTime<Utc>,
        max: usize,
    ) -> Result<Vec<Job>, Error>;

    /// Leased jobs whose `lease_expiry < now`, oldest expiry first.
    async fn expired_leases(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, Error>;

    /// Retrying jobs whose `next_run_at <= now`.
    async fn due_retries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, Error>;

    /// Commit `job` only if the stored version still equals
    /// `expected_version`. Returns false when the race was lost; the
    /// caller re-reads and decides (at most one internal retry).
    async fn compare_and_swap(&self, expected_version: u64, job: Job) -> Result<bool, Error>;

    /// Upsert a queue configuration. Never touches existing jobs.
    async fn save_queue(&self, queue: QueueConfig) -> Result<(), Error>;

    async fn get_queue(&self, name: &str) -> Result<Option<QueueConfig>, Error>;

    async fn list_queues(&self) -> Result<Vec<QueueConfig>, Error>;

    /// Job counts by status, optionally restricted to one queue.
    async fn counts(&self, queue: Option<&str>) -> Result<JobCounts, Error>;
}

/// Observability snapshot of the job population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub queued: usize,
    pub leased: usize,
    pub retrying: usize,
    pub succeeded: usize,
    pub failed: usize,
}
