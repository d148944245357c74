//! Lease reclamation sweep.
//!
//! The worker holding an expired lease is presumed crashed or hung, so the
//! sweep applies the same failure transition an explicit failure ack would.
//! Every reclamation goes through compare-and-swap: a lost race means the
//! worker acked (or another sweep won) in the meantime, which makes the
//! pass a no-op for that job — sweeping is idempotent.

use tracing::debug;

use super::JobService;
use super::ack::apply_failure;
use crate::error::Error;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Expired leases returned to eligibility (Queued or Retrying).
    pub reclaimed: usize,

    /// Expired leases that had exhausted their attempts (now Failed).
    pub exhausted: usize,

    /// Retrying jobs whose backoff elapsed, promoted to Queued.
    pub promoted: usize,
}

impl SweepStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl JobService {
    /// One bounded reclamation pass over at most `batch` jobs per phase.
    pub async fn sweep(&self, batch: usize) -> Result<SweepStats, Error> {
        let now = self.clock().now();
        let mut stats = SweepStats::default();

        for job in self.store().expired_leases(now, batch).await? {
            let queue = self.resolved_queue(&job.queue).await?;
            let expired_at = job.lease_expiry;
            let expected = job.version;
            let mut updated = job;
            let was_last_attempt = updated.attempt >= queue.max_attempts();
            apply_failure(
                &mut updated,
                &queue,
                Some(format!(
                    "lease expired at {}",
                    expired_at.map(|t| t.to_rfc3339()).unwrap_or_default()
                )),
                now,
            );
            let id = updated.id;
            if self.store().compare_and_swap(expected, updated).await? {
                if was_last_attempt {
                    stats.exhausted += 1;
                } else {
                    stats.reclaimed += 1;
                }
                debug!(%id, terminal = was_last_attempt, "reclaimed expired lease");
            }
            // else: acked concurrently, nothing to reclaim.
        }

        for job in self.store().due_retries(now, batch).await? {
            let expected = job.version;
            let mut updated = job;
            updated.requeue(None, now);
            if self.store().compare_and_swap(expected, updated).await? {
                stats.promoted += 1;
            }
        }

        Ok(stats)
    }
}
