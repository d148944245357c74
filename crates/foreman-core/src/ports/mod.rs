//! Ports: contracts the core consumes from external collaborators.

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock, deadline};
pub use store::{JobCounts, JobStore};
