//! Enqueue admission: validate and insert new jobs.

use serde_json::Value;
use tracing::debug;

use super::JobService;
use crate::domain::{Job, JobId};
use crate::error::Error;

impl JobService {
    /// Create one job per argument list, in input order.
    ///
    /// The queue need not pre-exist; an unsaved name falls back to
    /// process-wide defaults at dequeue time. Arguments are structured
    /// values (`serde_json::Value`), so anything expressible as
    /// null/bool/number/string/sequence/mapping is accepted by type.
    ///
    /// Errors with `InvalidArgument` on an empty queue name or an empty
    /// batch; insertion is all-or-nothing.
    pub async fn enqueue(
        &self,
        queue: &str,
        arg_lists: Vec<Vec<Value>>,
    ) -> Result<Vec<JobId>, Error> {
        if queue.trim().is_empty() {
            return Err(Error::InvalidArgument("queue name must not be empty".into()));
        }
        if arg_lists.is_empty() {
            return Err(Error::InvalidArgument(
                "enqueue requires at least one argument list".into(),
            ));
        }

        let now = self.clock().now();
        let jobs: Vec<Job> = arg_lists
            .into_iter()
            .map(|args| Job::new(JobId::generate(), queue, args, now))
            .collect();
        let ids: Vec<JobId> = jobs.iter().map(|j| j.id).collect();

        self.store().insert_jobs(jobs).await?;
        debug!(queue, count = ids.len(), "enqueued jobs");
        Ok(ids)
    }
}
