//! The per-surface read-through contract.
//!
//! `read` is the optimistic paint: synchronous, returns the most recent
//! snapshot whatever its age, after a corruption scan. `refresh` is the
//! reconciliation: it always runs the live fetch, overwrites the snapshot
//! only on success, and leaves a stale entry in place on failure: a
//! transient fetch error must never evict data a renderer could still
//! paint.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::corruption::{self, CorruptionPolicy};
use super::entry::Freshness;
use super::keys::SurfaceKey;
use super::store::SnapshotStore;

const SOURCE: &str = "cache::surface";

/// A snapshot handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub payload: Value,
    pub written_at: OffsetDateTime,
    pub freshness: Freshness,
}

/// One content surface's handle onto the snapshot store.
#[derive(Clone)]
pub struct Surface {
    key: SurfaceKey,
    storage_key: String,
    ttl: Duration,
    enabled: bool,
    policy: CorruptionPolicy,
    store: Arc<SnapshotStore>,
}

impl Surface {
    pub(super) fn new(key: SurfaceKey, config: &CacheConfig, store: Arc<SnapshotStore>) -> Self {
        let storage_key = key.storage_key();
        let policy = CorruptionPolicy {
            require_absolute_media: key.requires_absolute_media(),
        };
        Self {
            ttl: config.ttl_for(&key),
            enabled: config.enabled,
            key,
            storage_key,
            policy,
            store,
        }
    }

    pub fn key(&self) -> &SurfaceKey {
        &self.key
    }

    /// The optimistic read. Returns the most recent snapshot for this
    /// surface regardless of age, or `None` on a cold or purged key.
    pub fn read(&self) -> Option<Snapshot> {
        if !self.enabled {
            return None;
        }

        let entry = match self.store.read(&self.storage_key) {
            Some(entry) => entry,
            None => {
                counter!("folio_snapshot_miss_total").increment(1);
                return None;
            }
        };

        if let Some(reason) = corruption::scan(&entry.payload, self.policy) {
            counter!("folio_snapshot_purge_total").increment(1);
            warn!(
                target = SOURCE,
                surface = self.storage_key,
                reason = reason.as_str(),
                "purging corrupted snapshot"
            );
            self.store.purge(&self.storage_key);
            return None;
        }

        let freshness = entry.freshness(self.ttl, OffsetDateTime::now_utc());
        match freshness {
            Freshness::Fresh => counter!("folio_snapshot_hit_total").increment(1),
            Freshness::Stale => {
                // Non-fatal: the stale payload is painted optimistically
                // while the caller schedules a refresh.
                counter!("folio_snapshot_stale_total").increment(1);
                warn!(
                    target = SOURCE,
                    surface = self.storage_key,
                    age_secs = entry.age(OffsetDateTime::now_utc()).as_secs(),
                    "serving stale snapshot pending refresh"
                );
            }
        }

        Some(Snapshot {
            payload: entry.payload,
            written_at: entry.written_at,
            freshness,
        })
    }

    /// Whether the current snapshot is fresh enough to skip a refresh.
    pub fn is_fresh(&self) -> bool {
        self.enabled
            && self
                .store
                .read(&self.storage_key)
                .map(|entry| {
                    entry.freshness(self.ttl, OffsetDateTime::now_utc()) == Freshness::Fresh
                })
                .unwrap_or(false)
    }

    /// The live fetch. On success the snapshot is overwritten with a fresh
    /// timestamp and the new payload is returned; on failure `None` is
    /// returned and whatever was cached stays put.
    pub async fn refresh<F, Fut, E>(&self, fetcher: F) -> Option<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
        E: std::fmt::Display,
    {
        match fetcher().await {
            Ok(payload) => {
                if self.enabled {
                    self.store.write(&self.storage_key, payload.clone());
                }
                Some(payload)
            }
            Err(err) => {
                counter!("folio_snapshot_refresh_failure_total").increment(1);
                warn!(
                    target = SOURCE,
                    surface = self.storage_key,
                    error = %err,
                    "refresh failed, keeping existing snapshot"
                );
                None
            }
        }
    }

    /// Paint-now semantics for server-side renders: a fresh snapshot is
    /// used as-is; otherwise the live fetch runs, and on its failure a
    /// stale snapshot is still better than nothing.
    pub async fn read_through<F, Fut, E>(&self, fetcher: F) -> Option<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
        E: std::fmt::Display,
    {
        let snapshot = self.read();
        if let Some(snapshot) = &snapshot {
            if snapshot.freshness == Freshness::Fresh {
                debug!(
                    target = SOURCE,
                    surface = self.storage_key,
                    "painting from fresh snapshot"
                );
                return Some(snapshot.payload.clone());
            }
        }

        match self.refresh(fetcher).await {
            Some(payload) => Some(payload),
            None => snapshot.map(|s| s.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn surface(key: SurfaceKey) -> (Surface, Arc<SnapshotStore>) {
        let store = Arc::new(SnapshotStore::new());
        let surface = Surface::new(key, &CacheConfig::default(), Arc::clone(&store));
        (surface, store)
    }

    #[tokio::test]
    async fn refresh_success_overwrites_and_returns_payload() {
        let (surface, _store) = surface(SurfaceKey::HomeRecent);

        let refreshed = surface
            .refresh(|| async { Ok::<_, std::convert::Infallible>(json!([{"title": "a"}])) })
            .await;
        assert_eq!(refreshed, Some(json!([{"title": "a"}])));

        let snapshot = surface.read().expect("snapshot");
        assert_eq!(snapshot.payload, json!([{"title": "a"}]));
        assert_eq!(snapshot.freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_stale_entry() {
        let (surface, store) = surface(SurfaceKey::SidebarLatest);
        store.write("sidebar:latest", json!([{"title": "kept"}]));

        let refreshed = surface
            .refresh(|| async { Err::<Value, _>("fetch exploded") })
            .await;
        assert_eq!(refreshed, None);

        let snapshot = surface.read().expect("entry survives failed refresh");
        assert_eq!(snapshot.payload, json!([{"title": "kept"}]));
    }

    #[tokio::test]
    async fn read_purges_placeholder_payloads() {
        let (surface, store) = surface(SurfaceKey::HomeHero);
        store.write(
            "home:hero",
            json!({"title": "x", "image": "https://cdn.example.com/assets/img/placeholder.png"}),
        );

        assert!(surface.read().is_none());
        assert!(store.read("home:hero").is_none(), "entry must be purged");
    }

    #[tokio::test]
    async fn read_through_prefers_fresh_snapshot_over_fetch() {
        let (surface, store) = surface(SurfaceKey::HomeRecent);
        store.write("home:recent", json!(["cached"]));

        let painted = surface
            .read_through(|| async { Ok::<_, std::convert::Infallible>(json!(["live"])) })
            .await;
        assert_eq!(painted, Some(json!(["cached"])));
    }

    #[tokio::test]
    async fn read_through_falls_back_to_stale_on_fetch_failure() {
        let store = Arc::new(SnapshotStore::new());
        let config = CacheConfig {
            list_ttl_secs: 0,
            ..CacheConfig::default()
        };
        let surface = Surface::new(SurfaceKey::HomeRecent, &config, Arc::clone(&store));
        store.write("home:recent", json!(["stale"]));

        let painted = surface
            .read_through(|| async { Err::<Value, _>("offline") })
            .await;
        assert_eq!(painted, Some(json!(["stale"])));
    }

    #[tokio::test]
    async fn surfaces_do_not_observe_each_other() {
        let store = Arc::new(SnapshotStore::new());
        let config = CacheConfig::default();
        let guides = Surface::new(
            SurfaceKey::Category("guides".to_string()),
            &config,
            Arc::clone(&store),
        );
        let news = Surface::new(
            SurfaceKey::Category("news".to_string()),
            &config,
            Arc::clone(&store),
        );

        let _ = guides
            .refresh(|| async { Ok::<_, std::convert::Infallible>(json!(["g"])) })
            .await;
        let _ = news
            .refresh(|| async { Err::<Value, _>("down") })
            .await;

        assert_eq!(guides.read().expect("guides").payload, json!(["g"]));
        assert!(news.read().is_none());
    }

    #[tokio::test]
    async fn disabled_cache_reads_nothing_but_still_fetches() {
        let store = Arc::new(SnapshotStore::new());
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let surface = Surface::new(
            SurfaceKey::ArticleById(Uuid::nil()),
            &config,
            Arc::clone(&store),
        );

        let painted = surface
            .read_through(|| async { Ok::<_, std::convert::Infallible>(json!("live")) })
            .await;
        assert_eq!(painted, Some(json!("live")));
        assert!(surface.read().is_none());
        assert!(store.is_empty());
    }
}
