//! Lease monitor: recurring background sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::service::JobService;

/// Handle to the background reclamation loop.
///
/// - `request_shutdown()` stops the loop after the current tick.
/// - `shutdown_and_join()` stops it and waits for the task to finish.
///
/// The loop shares no mutable state with request paths; everything goes
/// through the store's atomic operations, so a sweep racing an ack is
/// resolved by compare-and-swap, not by locking.
pub struct LeaseMonitor {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl LeaseMonitor {
    /// Spawn the sweep loop: wake every `interval`, run one bounded pass.
    pub fn spawn(service: Arc<JobService>, interval: Duration, batch: usize) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        // A dropped sender also means stop.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(interval) => {
                        match service.sweep(batch).await {
                            Ok(stats) if !stats.is_empty() => {
                                info!(
                                    reclaimed = stats.reclaimed,
                                    exhausted = stats.exhausted,
                                    promoted = stats.promoted,
                                    "lease sweep"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "lease sweep failed"),
                        }
                    }
                }
            }
        });

        Self { shutdown_tx, join }
    }

    /// Request shutdown without waiting.
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for the loop to exit.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Defaults;
    use crate::domain::{JobStatus, QueueSpec};
    use crate::ports::SystemClock;
    use crate::store::InMemoryStore;

    // Uses the system clock: the monitor loop sleeps on tokio time, so the
    // scenario runs with short real durations instead of the manual clock.
    #[tokio::test]
    async fn monitor_reclaims_expired_lease_in_background() {
        let store = Arc::new(InMemoryStore::new());
        let svc = Arc::new(JobService::new(
            store,
            Arc::new(SystemClock),
            Defaults::default(),
        ));

        svc.save_queue(QueueSpec {
            name: "q".into(),
            concurrency: Some(1),
            max_retries: Some(3),
            lease_duration: Some(Duration::from_millis(50)),
            ..QueueSpec::default()
        })
        .await
        .unwrap();

        let id = svc.enqueue("q", vec![vec![]]).await.unwrap()[0];
        svc.dequeue(1, Some("q"), &[]).await.unwrap();

        let monitor = LeaseMonitor::spawn(svc.clone(), Duration::from_millis(20), 100);

        // Wait for the lease to expire and a sweep to pick it up.
        let mut reclaimed = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if svc.get_job(id).await.unwrap().status == JobStatus::Queued {
                reclaimed = true;
                break;
            }
        }
        monitor.shutdown_and_join().await;

        assert!(reclaimed, "monitor never requeued the expired lease");
        let job = svc.get_job(id).await.unwrap();
        assert_eq!(job.attempt, 1);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let svc = Arc::new(JobService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(SystemClock),
            Defaults::default(),
        ));

        let monitor = LeaseMonitor::spawn(svc, Duration::from_millis(10), 100);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Must complete promptly rather than hang.
        tokio::time::timeout(Duration::from_secs(1), monitor.shutdown_and_join())
            .await
            .expect("monitor did not shut down");
    }
}
