//! Demo wiring: in-memory store, one queue, one worker loop.
//!
//! Enqueues a couple of jobs, leases and acks them (the first job fails
//! once to show the retry path), and lets the lease monitor run alongside.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foreman_core::{
    AckStatus, Defaults, InMemoryStore, JobService, JobStatus, LeaseMonitor, QueueSpec, SystemClock,
};

#[tokio::main]
async fn main() -> Result<(), foreman_core::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,foreman_core=debug")),
        )
        .init();

    // (A) Store, clock and defaults are explicit; the service owns nothing.
    let defaults = Defaults::default();
    let service = Arc::new(JobService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(SystemClock),
        defaults.clone(),
    ));

    // (B) Save a queue: two concurrent leases, one retry, short lease.
    let queue = service
        .save_queue(QueueSpec {
            name: "emails".into(),
            concurrency: Some(2),
            max_retries: Some(1),
            lease_duration: Some(Duration::from_secs(5)),
            ..QueueSpec::default()
        })
        .await?;
    info!(?queue, "saved queue");

    // (C) Lease monitor runs in the background.
    let monitor = LeaseMonitor::spawn(
        service.clone(),
        defaults.sweep_interval,
        defaults.sweep_batch,
    );

    // (D) Enqueue two jobs.
    let ids = service
        .enqueue(
            "emails",
            vec![
                vec![json!({"to": "a@example.com"})],
                vec![json!({"to": "b@example.com"})],
            ],
        )
        .await?;
    info!(?ids, "enqueued");

    // (E) Worker loop: dequeue, "process", ack. Fail the first lease once
    // so the retry path is visible.
    let mut failed_once = false;
    loop {
        let jobs = service.dequeue(2, Some("emails"), &[]).await?;
        if jobs.is_empty() {
            let counts = service.counts(Some("emails")).await?;
            if counts.queued == 0 && counts.leased == 0 && counts.retrying == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            continue;
        }

        for job in jobs {
            if !failed_once {
                failed_once = true;
                info!(id = %job.id, attempt = job.attempt, "failing");
                service.ack(job.id, AckStatus::Failure, None).await?;
            } else {
                info!(id = %job.id, attempt = job.attempt, "sending");
                service.ack(job.id, AckStatus::Success, None).await?;
            }
        }
    }

    // (F) Final states.
    for id in ids {
        let job = service.get_job(id).await?;
        assert!(matches!(job.status, JobStatus::Succeeded | JobStatus::Failed));
        info!(
            id = %job.id,
            status = %job.status,
            attempts = job.attempt,
            last_error = ?job.last_error,
            "final state"
        );
    }
    info!(counts = ?service.counts(Some("emails")).await?, "done");

    monitor.shutdown_and_join().await;
    Ok(())
}
