//! Queue registry: configuration upserts and listing.

use tracing::debug;

use super::JobService;
use crate::domain::{QueueConfig, QueueSpec};
use crate::error::Error;

impl JobService {
    /// Upsert a queue configuration and echo the resolved result.
    ///
    /// Unset fields take process-wide defaults. Limits are `u32`, so the
    /// negative values the contract rejects are unrepresentable; the one
    /// remaining `InvalidArgument` is an empty name. Saving over an
    /// existing name replaces configuration only, never jobs; in-flight
    /// leases keep the expiry they were stamped with.
    pub async fn save_queue(&self, spec: QueueSpec) -> Result<QueueConfig, Error> {
        if spec.name.trim().is_empty() {
            return Err(Error::InvalidArgument("queue name must not be empty".into()));
        }

        let resolved = spec.resolve(self.defaults());
        self.store().save_queue(resolved.clone()).await?;
        debug!(queue = %resolved.name, concurrency = resolved.concurrency, "saved queue");
        Ok(resolved)
    }

    /// All known queue configurations, optionally filtered by label.
    pub async fn list_queues(&self, selectors: &[String]) -> Result<Vec<QueueConfig>, Error> {
        let queues = self.store().list_queues().await?;
        if selectors.is_empty() {
            return Ok(queues);
        }
        Ok(queues
            .into_iter()
            .filter(|q| q.matches_selectors(selectors))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Defaults;
    use crate::domain::JobStatus;
    use crate::service::testutil::{service, service_with_defaults};
    use std::time::Duration;

    #[tokio::test]
    async fn save_echoes_resolved_defaults() {
        let defaults = Defaults {
            concurrency: 4,
            max_retries: 7,
            lease_duration: Duration::from_secs(90),
            ..Defaults::default()
        };
        let (svc, _) = service_with_defaults(defaults);

        let saved = svc.save_queue(QueueSpec::named("q")).await.unwrap();
        assert_eq!(saved.concurrency, 4);
        assert_eq!(saved.max_retries, 7);
        assert_eq!(saved.lease_duration, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn save_rejects_empty_name() {
        let (svc, _) = service();
        let err = svc.save_queue(QueueSpec::named("")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn upsert_replaces_config_but_not_jobs() {
        let (svc, _) = service();
        svc.save_queue(QueueSpec {
            name: "q".into(),
            concurrency: Some(3),
            ..QueueSpec::default()
        })
        .await
        .unwrap();

        let id = svc.enqueue("q", vec![vec![]]).await.unwrap()[0];

        svc.save_queue(QueueSpec {
            name: "q".into(),
            concurrency: Some(9),
            ..QueueSpec::default()
        })
        .await
        .unwrap();

        let queues = svc.list_queues(&[]).await.unwrap();
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].concurrency, 9);
        assert_eq!(svc.get_job(id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn list_filters_by_label() {
        let (svc, _) = service();
        svc.save_queue(QueueSpec {
            name: "a".into(),
            labels: ["bulk".to_string()].into(),
            ..QueueSpec::default()
        })
        .await
        .unwrap();
        svc.save_queue(QueueSpec::named("b")).await.unwrap();

        assert_eq!(svc.list_queues(&[]).await.unwrap().len(), 2);
        let filtered = svc.list_queues(&["bulk".to_string()]).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");
    }

    #[tokio::test]
    async fn config_change_applies_on_next_dequeue() {
        let (svc, _) = service();
        svc.save_queue(QueueSpec {
            name: "q".into(),
            concurrency: Some(1),
            ..QueueSpec::default()
        })
        .await
        .unwrap();
        svc.enqueue("q", vec![vec![], vec![]]).await.unwrap();

        assert_eq!(svc.dequeue(2, Some("q"), &[]).await.unwrap().len(), 1);

        // Raising concurrency frees a slot for the next pass.
        svc.save_queue(QueueSpec {
            name: "q".into(),
            concurrency: Some(2),
            ..QueueSpec::default()
        })
        .await
        .unwrap();
        assert_eq!(svc.dequeue(2, Some("q"), &[]).await.unwrap().len(), 1);
    }
}
