//! foreman-core
//!
//! Core of a job queue service: clients enqueue named jobs with arguments,
//! workers dequeue (lease) them under per-queue concurrency limits and ack
//! success or failure, driving retry or terminal state.
//!
//! Module map:
//! - **domain**: job records, statuses, queue configuration, IDs
//! - **ports**: contracts consumed from collaborators (JobStore, Clock)
//! - **store**: in-memory JobStore implementation
//! - **service**: the request/response surface (enqueue, dequeue, ack,
//!   get_job, save_queue, list_queues) and the sweep pass
//! - **monitor**: background lease reclamation loop
//! - **config**: explicit process-wide defaults
//! - **error**: the error taxonomy

pub mod config;
pub mod domain;
pub mod error;
pub mod monitor;
pub mod ports;
pub mod service;
pub mod store;

pub use config::Defaults;
pub use domain::{Job, JobId, JobStatus, QueueConfig, QueueSpec};
pub use error::Error;
pub use monitor::LeaseMonitor;
pub use ports::{Clock, JobCounts, JobStore, ManualClock, SystemClock};
pub use service::{AckRequest, AckStatus, JobService, SweepStats};
pub use store::InMemoryStore;
