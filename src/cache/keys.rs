//! Surface key definitions.
//!
//! Each content surface owns one namespaced key in the snapshot store.
//! Nothing outside a surface's own key is ever read or written on its
//! behalf, which is what keeps surface lifecycles independent.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceKey {
    /// The home page hero spot.
    HomeHero,
    /// The home page recent-items list.
    HomeRecent,
    /// The sidebar latest-items list.
    SidebarLatest,
    /// A category page list, one key per category slug.
    Category(String),
    /// A single article body, one key per item identity.
    ArticleById(Uuid),
}

impl SurfaceKey {
    /// The namespaced storage key for this surface.
    pub fn storage_key(&self) -> String {
        match self {
            SurfaceKey::HomeHero => "home:hero".to_string(),
            SurfaceKey::HomeRecent => "home:recent".to_string(),
            SurfaceKey::SidebarLatest => "sidebar:latest".to_string(),
            SurfaceKey::Category(slug) => format!("category:{slug}"),
            SurfaceKey::ArticleById(id) => format!("article:id:{id}"),
        }
    }

    /// Whether payloads under this key are expected to carry absolute
    /// media URLs. Card lists syndicate across origins, so a relative URL
    /// there is a corruption signature rather than a valid state.
    pub fn requires_absolute_media(&self) -> bool {
        !matches!(self, SurfaceKey::ArticleById(_))
    }
}
