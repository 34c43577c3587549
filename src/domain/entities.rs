//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::slug::{SlugError, derive_slug};
use crate::domain::types::ContentStatus;

/// An authored content item. Owned and mutated by the authoring
/// collaborator; this crate only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItemRecord {
    pub id: Uuid,
    pub title: String,
    /// Stored slug, when the author pinned one explicitly. When absent the
    /// canonical slug is derived from the title.
    pub slug: Option<String>,
    pub description: String,
    pub body_html: String,
    pub hero_image: Option<String>,
    pub category_id: Uuid,
    pub status: ContentStatus,
    pub scheduled_at: Option<OffsetDateTime>,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ContentItemRecord {
    /// The slug this item is addressable under: the stored slug when
    /// present, otherwise derived from the title.
    pub fn canonical_slug(&self) -> Result<String, SlugError> {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => Ok(slug.clone()),
            _ => derive_slug(&self.title),
        }
    }

    /// Timestamp advertised as `lastmod` in the site index.
    pub fn last_modified(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(self.updated_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

/// A content item joined with everything a full render needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItemDetail {
    pub item: ContentItemRecord,
    pub category: CategoryRecord,
    pub tags: Vec<TagRecord>,
}

/// A condensed card used by list surfaces and the related/sidebar
/// fragments of a rendered document. Also the wire shape stored in list
/// snapshot payloads, so it stays serde-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCard {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub hero_image: Option<String>,
    pub category_slug: String,
    pub published_at: Option<OffsetDateTime>,
}

/// Metadata describing a stored artifact blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub slug: String,
    pub canonical_url: String,
    pub description: String,
    pub image: Option<String>,
    /// Lowercase hex SHA-256 of the stored document, used as the ETag.
    pub checksum: String,
    pub written_at: OffsetDateTime,
}
