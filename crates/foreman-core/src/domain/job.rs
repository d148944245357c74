//! Job record: args + lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::JobId;

/// Lifecycle status of a job.
///
/// Transitions:
/// - Queued -> Leased (dequeue, attempt incremented)
/// - Leased -> Succeeded (ack success, terminal)
/// - Leased -> Failed (ack failure with attempts exhausted, terminal)
/// - Leased -> Queued (ack failure with attempts remaining, no backoff)
/// - Leased -> Retrying (ack failure with attempts remaining, backoff set)
/// - Retrying -> Queued (backoff elapsed, promoted by the lease monitor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Leased,
    Retrying,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Leased => "leased",
            JobStatus::Retrying => "retrying",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A job in the queue.
///
/// Design:
/// - The store is the single source of truth; callers work on clones and
///   commit them back with compare-and-swap keyed on `version`.
/// - All state transitions happen through the methods below, which keep
///   `lease_expiry`/`next_run_at` consistent with `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue: String,
    pub args: Vec<Value>,
    pub status: JobStatus,

    /// Number of leases granted so far (incremented on each lease).
    pub attempt: u32,

    /// Set while `status == Leased`, cleared on every other transition.
    pub lease_expiry: Option<DateTime<Utc>>,

    /// Set while `status == Retrying`: earliest time the job may run again.
    pub next_run_at: Option<DateTime<Utc>>,

    /// Result payload reported on ack.
    pub result_data: Option<Map<String, Value>>,

    /// Last failure message (ack failure or lease expiry).
    pub last_error: Option<String>,

    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Store revision for optimistic compare-and-swap.
    pub version: u64,
}

impl Job {
    pub fn new(id: JobId, queue: impl Into<String>, args: Vec<Value>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            queue: queue.into(),
            args,
            status: JobStatus::Queued,
            attempt: 0,
            lease_expiry: None,
            next_run_at: None,
            result_data: None,
            last_error: None,
            enqueued_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Mark as leased (increments attempt, stamps expiry).
    pub fn mark_leased(&mut self, expiry: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = JobStatus::Leased;
        self.attempt += 1;
        self.lease_expiry = Some(expiry);
        self.next_run_at = None;
        self.updated_at = now;
    }

    /// Mark as succeeded (terminal).
    pub fn mark_succeeded(&mut self, result_data: Option<Map<String, Value>>, now: DateTime<Utc>) {
        self.status = JobStatus::Succeeded;
        self.lease_expiry = None;
        self.next_run_at = None;
        if result_data.is_some() {
            self.result_data = result_data;
        }
        self.updated_at = now;
    }

    /// Mark as failed (terminal, attempts exhausted).
    pub fn mark_failed(&mut self, error: Option<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.lease_expiry = None;
        self.next_run_at = None;
        if error.is_some() {
            self.last_error = error;
        }
        self.updated_at = now;
    }

    /// Return to Queued, eligible for another lease attempt.
    pub fn requeue(&mut self, error: Option<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Queued;
        self.lease_expiry = None;
        self.next_run_at = None;
        if error.is_some() {
            self.last_error = error;
        }
        self.updated_at = now;
    }

    /// Hold in Retrying until `next_run_at` passes.
    pub fn schedule_retry(
        &mut self,
        next_run_at: DateTime<Utc>,
        error: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = JobStatus::Retrying;
        self.lease_expiry = None;
        self.next_run_at = Some(next_run_at);
        if error.is_some() {
            self.last_error = error;
        }
        self.updated_at = now;
    }

    /// Whether this job may be selected for a lease at `now`.
    ///
    /// Queued jobs are always eligible; Retrying jobs only once their
    /// backoff has elapsed. Queue concurrency is checked by the scheduler,
    /// not here.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Queued => true,
            JobStatus::Retrying => self.next_run_at.is_none_or(|t| t <= now),
            _ => false,
        }
    }

    /// Whether the lease has expired at `now` (only meaningful while Leased).
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Leased && self.lease_expiry.is_some_and(|t| t < now)
    }
}
