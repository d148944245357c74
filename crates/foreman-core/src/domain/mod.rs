//! Domain model (IDs, job records, queue configuration).

pub mod ids;
pub mod job;
pub mod queue;

pub use ids::JobId;
pub use job::{Job, JobStatus};
pub use queue::{QueueConfig, QueueSpec};
