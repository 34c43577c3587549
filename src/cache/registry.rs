//! Surface registry: the one place surfaces are minted from.

use std::sync::Arc;

use super::config::CacheConfig;
use super::keys::SurfaceKey;
use super::store::SnapshotStore;
use super::surface::Surface;

/// Hands out per-surface cache handles over a shared substrate.
#[derive(Clone)]
pub struct Surfaces {
    config: CacheConfig,
    store: Arc<SnapshotStore>,
}

impl Surfaces {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            store: Arc::new(SnapshotStore::new()),
        }
    }

    pub fn surface(&self, key: SurfaceKey) -> Surface {
        Surface::new(key, &self.config, Arc::clone(&self.store))
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn surfaces_share_one_substrate() {
        let surfaces = Surfaces::new(CacheConfig::default());
        let hero = surfaces.surface(SurfaceKey::HomeHero);

        let _ = hero
            .refresh(|| async { Ok::<_, std::convert::Infallible>(json!({"title": "t"})) })
            .await;

        assert_eq!(surfaces.store().len(), 1);
        let again = surfaces.surface(SurfaceKey::HomeHero);
        assert!(again.read().is_some());
    }
}
