//! Dequeue scheduling: lease eligible jobs under concurrency limits.

use tracing::debug;

use super::JobService;
use crate::domain::{Job, QueueConfig};
use crate::error::Error;

impl JobService {
    /// Lease up to `num` eligible jobs (`num = 0` means the configured
    /// default, 1).
    ///
    /// With a queue name, jobs come from exactly that queue in FIFO
    /// (enqueue-order) sequence. With selectors instead, jobs are drawn
    /// from every queue whose labels intersect the selector set, ordered
    /// globally by enqueue time (ties broken by id). One of the two must
    /// be given.
    ///
    /// Selection and transition are one atomic store step: concurrent
    /// calls never lease the same job and never jointly exceed a queue's
    /// concurrency limit. No eligible jobs is an empty result, not an
    /// error.
    pub async fn dequeue(
        &self,
        num: usize,
        queue: Option<&str>,
        selectors: &[String],
    ) -> Result<Vec<Job>, Error> {
        let want = if num == 0 {
            self.defaults().dequeue_num
        } else {
            num
        };

        let queues: Vec<QueueConfig> = match queue {
            Some(name) => {
                if name.trim().is_empty() {
                    return Err(Error::InvalidArgument("queue name must not be empty".into()));
                }
                vec![self.resolved_queue(name).await?]
            }
            None => {
                if selectors.is_empty() {
                    return Err(Error::InvalidArgument(
                        "dequeue requires a queue name or selectors".into(),
                    ));
                }
                self.store()
                    .list_queues()
                    .await?
                    .into_iter()
                    .filter(|q| q.matches_selectors(selectors))
                    .collect()
            }
        };

        if queues.is_empty() {
            // Selectors that match no saved queue: nothing eligible.
            return Ok(Vec::new());
        }

        let now = self.clock().now();
        let leased = self.store().claim(&queues, now, want).await?;
        if !leased.is_empty() {
            debug!(count = leased.len(), "leased jobs");
        }
        Ok(leased)
    }
}
