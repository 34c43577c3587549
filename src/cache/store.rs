//! The snapshot storage substrate.
//!
//! A sharded concurrent map keyed by namespaced surface keys. The map's
//! per-key atomicity is the only synchronization: no lock is held across a
//! suspension point, and no surface can observe another surface's write in
//! a torn state.

use dashmap::DashMap;
use serde_json::Value;

use super::entry::SnapshotEntry;

#[derive(Default)]
pub struct SnapshotStore {
    entries: DashMap<String, SnapshotEntry>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent write for `key`, regardless of age.
    pub fn read(&self, key: &str) -> Option<SnapshotEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Overwrite `key` with a freshly timestamped entry.
    pub fn write(&self, key: &str, payload: Value) {
        self.entries
            .insert(key.to_string(), SnapshotEntry::new(payload));
    }

    /// Remove `key` outright. Only corruption detection calls this;
    /// ordinary entries age out by timestamp comparison instead.
    pub fn purge(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
