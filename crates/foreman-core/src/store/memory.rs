//! In-memory JobStore implementation.
//!
//! Reference implementation and test double. A single mutex over the whole
//! state makes every trait method one atomic step, which is exactly the
//! isolation the port contract asks for (`claim` in particular must check
//! capacity and transition jobs in the same step).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{Job, JobId, JobStatus, QueueConfig};
use crate::error::Error;
use crate::ports::clock::deadline;
use crate::ports::store::{JobCounts, JobStore};

/// In-memory store state.
struct MemoryState {
    /// All job records (single source of truth).
    jobs: HashMap<JobId, Job>,

    /// Saved queue configurations, keyed by name.
    queues: HashMap<String, QueueConfig>,
}

impl MemoryState {
    fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            queues: HashMap::new(),
        }
    }

    fn leased_count(&self, queue: &str) -> usize {
        self.jobs
            .values()
            .filter(|j| j.queue == queue && j.status == JobStatus::Leased)
            .count()
    }

    /// Eligible jobs in the given queues, FIFO by (enqueued_at, id).
    fn candidates(&self, queues: &[&str], now: DateTime<Utc>) -> Vec<JobId> {
        let mut out: Vec<(DateTime<Utc>, JobId)> = self
            .jobs
            .values()
            .filter(|j| queues.contains(&j.queue.as_str()) && j.is_eligible(now))
            .map(|j| (j.enqueued_at, j.id))
            .collect();
        out.sort();
        out.into_iter().map(|(_, id)| id).collect()
    }
}

/// In-memory JobStore.
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn insert_jobs(&self, jobs: Vec<Job>) -> Result<(), Error> {
        let mut state = self.state.lock().await;

        // All-or-nothing: reject the whole batch before touching anything.
        for job in &jobs {
            if state.jobs.contains_key(&job.id) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate job id: {}",
                    job.id
                )));
            }
        }
        for job in jobs {
            state.jobs.insert(job.id, job);
        }
        Ok(())
    }

    async fn get_job(&self, id: JobId) -> Result<Job, Error> {
        let state = self.state.lock().await;
        state.jobs.get(&id).cloned().ok_or(Error::JobNotFound(id))
    }

    async fn claim(
        &self,
        queues: &[QueueConfig],
        now: DateTime<Utc>,
        max: usize,
    ) -> Result<Vec<Job>, Error> {
        let mut state = self.state.lock().await;

        let names: Vec<&str> = queues.iter().map(|q| q.name.as_str()).collect();
        let mut capacity: HashMap<&str, usize> = queues
            .iter()
            .map(|q| {
                let leased = state.leased_count(&q.name);
                (q.name.as_str(), (q.concurrency as usize).saturating_sub(leased))
            })
            .collect();

        let mut granted = Vec::new();
        for id in state.candidates(&names, now) {
            if granted.len() >= max {
                break;
            }
            let Some(job) = state.jobs.get(&id) else {
                continue;
            };
            let Some(queue) = queues.iter().find(|q| q.name == job.queue) else {
                continue;
            };
            let Some(slots) = capacity.get_mut(queue.name.as_str()) else {
                continue;
            };
            if *slots == 0 {
                continue;
            }
            *slots -= 1;

            let expiry = deadline(now, queue.lease_duration);
            let job = state.jobs.get_mut(&id).expect("candidate id must exist");
            job.mark_leased(expiry, now);
            job.version += 1;
            granted.push(job.clone());
        }

        Ok(granted)
    }

    async fn expired_leases(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, Error> {
        let state = self.state.lock().await;
        let mut out: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.lease_expired(now))
            .cloned()
            .collect();
        out.sort_by_key(|j| (j.lease_expiry, j.id));
        out.truncate(limit);
        Ok(out)
    }

    async fn due_retries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, Error> {
        let state = self.state.lock().await;
        let mut out: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Retrying && j.next_run_at.is_some_and(|t| t <= now))
            .cloned()
            .collect();
        out.sort_by_key(|j| (j.next_run_at, j.id));
        out.truncate(limit);
        Ok(out)
    }

    async fn compare_and_swap(&self, expected_version: u64, mut job: Job) -> Result<bool, Error> {
        let mut state = self.state.lock().await;
        let Some(current) = state.jobs.get(&job.id) else {
            return Err(Error::JobNotFound(job.id));
        };
        if current.version != expected_version {
            return Ok(false);
        }
        job.version = expected_version + 1;
        state.jobs.insert(job.id, job);
        Ok(true)
    }

    async fn save_queue(&self, queue: QueueConfig) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.queues.insert(queue.name.clone(), queue);
        Ok(())
    }

    async fn get_queue(&self, name: &str) -> Result<Option<QueueConfig>, Error> {
        let state = self.state.lock().await;
        Ok(state.queues.get(name).cloned())
    }

    async fn list_queues(&self) -> Result<Vec<QueueConfig>, Error> {
        let state = self.state.lock().await;
        let mut out: Vec<QueueConfig> = state.queues.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn counts(&self, queue: Option<&str>) -> Result<JobCounts, Error> {
        let state = self.state.lock().await;
        let mut counts = JobCounts::default();
        for job in state.jobs.values() {
            if queue.is_some_and(|q| q != job.queue) {
                continue;
            }
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Leased => counts.leased += 1,
                JobStatus::Retrying => counts.retrying += 1,
                JobStatus::Succeeded => counts.succeeded += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Defaults;
    use std::time::Duration;

    fn queue(name: &str, concurrency: u32) -> QueueConfig {
        let mut q = QueueConfig::fallback(name, &Defaults::default());
        q.concurrency = concurrency;
        q.lease_duration = Duration::from_secs(30);
        q
    }

    fn job(queue: &str, now: DateTime<Utc>) -> Job {
        Job::new(JobId::generate(), queue, vec![], now)
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let j = job("q", now);
        let id = j.id;

        store.insert_jobs(vec![j]).await.unwrap();
        let got = store.get_job(id).await.unwrap();
        assert_eq!(got.status, JobStatus::Queued);
        assert_eq!(got.queue, "q");
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_job(JobId::generate()).await.unwrap_err();
        assert!(matches!(err, Error::JobNotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_insert_rejects_whole_batch() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let existing = job("q", now);
        let dup_id = existing.id;
        store.insert_jobs(vec![existing.clone()]).await.unwrap();

        let fresh = job("q", now);
        let fresh_id = fresh.id;
        let err = store
            .insert_jobs(vec![fresh, Job::new(dup_id, "q", vec![], now)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // The fresh job must not have been inserted.
        assert!(matches!(
            store.get_job(fresh_id).await,
            Err(Error::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn claim_respects_concurrency_limit() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for _ in 0..5 {
            store.insert_jobs(vec![job("q", now)]).await.unwrap();
        }

        let q = queue("q", 2);
        let leased = store.claim(&[q.clone()], now, 10).await.unwrap();
        assert_eq!(leased.len(), 2);

        // Limit already reached: nothing more to grant.
        let more = store.claim(&[q], now, 10).await.unwrap();
        assert!(more.is_empty());

        let counts = store.counts(Some("q")).await.unwrap();
        assert_eq!(counts.leased, 2);
        assert_eq!(counts.queued, 3);
    }

    #[tokio::test]
    async fn claim_is_fifo_by_enqueue_time() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let first = job("q", now);
        let second = job("q", now + chrono::TimeDelta::seconds(1));
        let (first_id, second_id) = (first.id, second.id);
        store.insert_jobs(vec![second, first]).await.unwrap();

        let leased = store.claim(&[queue("q", 10)], now + chrono::TimeDelta::seconds(2), 2).await.unwrap();
        assert_eq!(leased[0].id, first_id);
        assert_eq!(leased[1].id, second_id);
        assert_eq!(leased[0].attempt, 1);
        assert!(leased[0].lease_expiry.is_some());
    }

    #[tokio::test]
    async fn compare_and_swap_detects_lost_race() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_jobs(vec![job("q", now)]).await.unwrap();

        let leased = store.claim(&[queue("q", 1)], now, 1).await.unwrap();
        let snapshot = leased[0].clone();

        // First writer wins.
        let mut update = snapshot.clone();
        update.mark_succeeded(None, now);
        assert!(store.compare_and_swap(snapshot.version, update).await.unwrap());

        // Second writer with the stale version loses.
        let mut stale = snapshot.clone();
        stale.requeue(None, now);
        assert!(!store.compare_and_swap(snapshot.version, stale).await.unwrap());

        let got = store.get_job(snapshot.id).await.unwrap();
        assert_eq!(got.status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn expired_leases_only_reports_overdue_jobs() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_jobs(vec![job("q", now)]).await.unwrap();
        store.insert_jobs(vec![job("q", now)]).await.unwrap();

        let leased = store.claim(&[queue("q", 2)], now, 2).await.unwrap();
        assert_eq!(leased.len(), 2);

        assert!(store.expired_leases(now, 10).await.unwrap().is_empty());

        let later = now + chrono::TimeDelta::seconds(31);
        let expired = store.expired_leases(later, 10).await.unwrap();
        assert_eq!(expired.len(), 2);
    }

    #[tokio::test]
    async fn queue_upsert_overwrites_config() {
        let store = InMemoryStore::new();
        store.save_queue(queue("q", 1)).await.unwrap();
        store.save_queue(queue("q", 7)).await.unwrap();

        let got = store.get_queue("q").await.unwrap().unwrap();
        assert_eq!(got.concurrency, 7);
        assert_eq!(store.list_queues().await.unwrap().len(), 1);
    }
}
