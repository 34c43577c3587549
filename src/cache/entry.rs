//! Snapshot entries: a timestamped payload per surface key.

use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;

/// Whether a snapshot is inside its surface's refresh window.
///
/// A stale snapshot is still served; staleness only means the background
/// refresh must not be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub written_at: OffsetDateTime,
    pub payload: Value,
}

impl SnapshotEntry {
    pub fn new(payload: Value) -> Self {
        Self {
            written_at: OffsetDateTime::now_utc(),
            payload,
        }
    }

    pub fn age(&self, now: OffsetDateTime) -> Duration {
        let age = now - self.written_at;
        age.try_into().unwrap_or(Duration::ZERO)
    }

    pub fn freshness(&self, ttl: Duration, now: OffsetDateTime) -> Freshness {
        if self.age(now) <= ttl {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}
