//! Snapshot cache configuration.

use std::time::Duration;

use serde::Deserialize;

use super::keys::SurfaceKey;

// TTLs gate background refreshes only; reads always return whatever is
// stored. Hero rotates faster than plain lists, article bodies slower.
const DEFAULT_LIST_TTL_SECS: u64 = 30 * 60;
const DEFAULT_HERO_TTL_SECS: u64 = 15 * 60;
const DEFAULT_ARTICLE_TTL_SECS: u64 = 60 * 60;

/// Snapshot cache configuration from `folio.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disabling the cache turns every read into a miss; refreshes still
    /// run and their results are discarded.
    pub enabled: bool,
    pub hero_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub article_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hero_ttl_secs: DEFAULT_HERO_TTL_SECS,
            list_ttl_secs: DEFAULT_LIST_TTL_SECS,
            article_ttl_secs: DEFAULT_ARTICLE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// The refresh cadence for a surface. Cadences are independent per
    /// surface kind; one slow surface never stretches another's window.
    pub fn ttl_for(&self, key: &SurfaceKey) -> Duration {
        let secs = match key {
            SurfaceKey::HomeHero => self.hero_ttl_secs,
            SurfaceKey::HomeRecent | SurfaceKey::SidebarLatest | SurfaceKey::Category(_) => {
                self.list_ttl_secs
            }
            SurfaceKey::ArticleById(_) => self.article_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}
