//! Ack processing: terminal/retry transitions reported by workers.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::JobService;
use crate::domain::{Job, JobId, JobStatus, QueueConfig};
use crate::error::Error;
use crate::ports::clock::deadline;

/// Worker-reported outcome of a leased job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Success,
    Failure,
}

/// One entry of an ack batch.
#[derive(Debug, Clone)]
pub struct AckRequest {
    pub id: JobId,
    pub status: AckStatus,
    pub result_data: Option<Map<String, Value>>,
    pub error: Option<String>,
}

impl AckRequest {
    pub fn success(id: JobId) -> Self {
        Self {
            id,
            status: AckStatus::Success,
            result_data: None,
            error: None,
        }
    }

    pub fn failure(id: JobId, error: impl Into<String>) -> Self {
        Self {
            id,
            status: AckStatus::Failure,
            result_data: None,
            error: Some(error.into()),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.result_data = Some(data);
        self
    }
}

/// The failure path shared by ack and the lease monitor sweep: terminal
/// failure when attempts are exhausted, otherwise back to eligibility
/// (straight to Queued, or held in Retrying when the queue has a backoff).
pub(crate) fn apply_failure(
    job: &mut Job,
    queue: &QueueConfig,
    error: Option<String>,
    now: DateTime<Utc>,
) {
    if job.attempt >= queue.max_attempts() {
        job.mark_failed(error, now);
    } else if queue.retry_backoff > Duration::ZERO {
        job.schedule_retry(deadline(now, queue.retry_backoff), error, now);
    } else {
        job.requeue(error, now);
    }
}

impl JobService {
    /// Acknowledge a single leased job.
    ///
    /// `InvalidState` if the job is not currently leased (double-ack and
    /// ack-after-reclaim are rejected, not ignored).
    pub async fn ack(
        &self,
        id: JobId,
        status: AckStatus,
        result_data: Option<Map<String, Value>>,
    ) -> Result<(), Error> {
        let error = match status {
            AckStatus::Success => None,
            AckStatus::Failure => Some("reported failed".to_string()),
        };
        self.ack_many(vec![AckRequest {
            id,
            status,
            result_data,
            error,
        }])
        .await
    }

    /// Acknowledge a batch.
    ///
    /// The whole batch is validated before anything is mutated: one
    /// non-leased job (or a duplicate id) fails the call with no partial
    /// application.
    ///
    /// Caveat: validation and commit are separate store operations, so a
    /// sweep may reclaim a lease in between. Such an entry surfaces as
    /// `InvalidState` after earlier entries have already committed — the
    /// one partial-result window this contract has. Committed transitions
    /// are never rolled back; callers retrying a failed batch should
    /// resubmit only the entries that were not applied.
    pub async fn ack_many(&self, acks: Vec<AckRequest>) -> Result<(), Error> {
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(acks.len());
        for ack in &acks {
            if !seen.insert(ack.id) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate job id in ack batch: {}",
                    ack.id
                )));
            }
            let job = self.store().get_job(ack.id).await?;
            if job.status != JobStatus::Leased {
                return Err(Error::InvalidState {
                    id: job.id,
                    status: job.status,
                });
            }
            let queue = self.resolved_queue(&job.queue).await?;
            staged.push((job, queue));
        }

        for (ack, (job, queue)) in acks.into_iter().zip(staged) {
            self.apply_ack(ack, job, queue).await?;
        }
        Ok(())
    }

    async fn apply_ack(&self, ack: AckRequest, job: Job, queue: QueueConfig) -> Result<(), Error> {
        let now = self.clock().now();

        let expected = job.version;
        let mut updated = job;
        transition(&ack, &mut updated, &queue, now);
        if self.store().compare_and_swap(expected, updated).await? {
            debug!(id = %ack.id, status = ?ack.status, "acked job");
            return Ok(());
        }

        // Lost the race, most likely to a sweep that reclaimed the lease
        // between validation and commit. One retry against fresh state.
        let fresh = self.store().get_job(ack.id).await?;
        if fresh.status != JobStatus::Leased {
            return Err(Error::InvalidState {
                id: fresh.id,
                status: fresh.status,
            });
        }
        let expected = fresh.version;
        let mut updated = fresh;
        transition(&ack, &mut updated, &queue, now);
        if self.store().compare_and_swap(expected, updated).await? {
            debug!(id = %ack.id, status = ?ack.status, "acked job");
            Ok(())
        } else {
            Err(Error::Unavailable(format!(
                "job {} kept changing under the ack, giving up",
                ack.id
            )))
        }
    }
}

fn transition(ack: &AckRequest, job: &mut Job, queue: &QueueConfig, now: DateTime<Utc>) {
    if ack.result_data.is_some() {
        job.result_data = ack.result_data.clone();
    }
    match ack.status {
        AckStatus::Success => job.mark_succeeded(None, now),
        AckStatus::Failure => apply_failure(job, queue, ack.error.clone(), now),
    }
}
