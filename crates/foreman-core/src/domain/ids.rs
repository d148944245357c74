//! Domain identifiers (strongly-typed IDs).
//!
//! Job identifiers are ULIDs: sortable by creation time (which backs the
//! FIFO tie-break in the dequeue scheduler) and generatable without
//! coordination across processes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of a Job. Assigned at enqueue time, immutable afterwards.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(Ulid);

impl JobId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for JobId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sortable_by_generation_order() {
        let id1 = JobId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = JobId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id3 = JobId::generate();

        assert!(id1 < id2);
        assert!(id2 < id3);
    }

    #[test]
    fn ids_round_trip_through_display() {
        let id = JobId::generate();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let id = JobId::generate();
        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: JobId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }
}
