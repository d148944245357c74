use thiserror::Error;

use crate::domain::{JobId, JobStatus};

/// Error taxonomy of the core.
///
/// `Unavailable` is the only transient kind; callers retry it, the core
/// does not (beyond the single compare-and-swap re-read on a lost race).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("job {id} is {status}, expected leased")]
    InvalidState { id: JobId, status: JobStatus },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
