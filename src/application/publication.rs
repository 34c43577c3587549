//! Publication synchronization.
//!
//! Whenever a content item's publication state changes, this service brings
//! the artifact store and the site index to the matching end state: render
//! and write the document on publish/update, delete it on unpublish/delete,
//! and regenerate the index wholesale afterwards. Artifact mutation always
//! happens-before index regeneration; an index failure after a successful
//! artifact write is reported as a partial sync and is safe to retry by
//! regenerating the index alone.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::artifacts::{ArtifactError, ArtifactStore, checksum_hex};
use crate::application::repos::{ContentRepo, RepoError};
use crate::application::site_index::{SiteIndexError, SiteIndexService, canonical_url};
use crate::application::template::{ArticleDocument, TemplateError};
use crate::domain::entities::{ArtifactMeta, ContentItemDetail};
use crate::domain::slug::SlugError;
use crate::domain::types::ContentStatus;

const RELATED_LIMIT: u32 = 4;
const SIDEBAR_LIMIT: u32 = 5;

/// The authoring-side event that triggered a synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationEvent {
    Published { id: Uuid },
    Updated { id: Uuid },
    Unpublished { id: Uuid },
    /// The record is already gone on delete, so the authoring side passes
    /// along the slug it knew, when it knew one.
    Deleted { id: Uuid, slug: Option<String> },
}

impl PublicationEvent {
    pub fn item_id(&self) -> Uuid {
        match self {
            PublicationEvent::Published { id }
            | PublicationEvent::Updated { id }
            | PublicationEvent::Unpublished { id }
            | PublicationEvent::Deleted { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Artifact written and index regenerated.
    Synced { slug: String },
    /// Artifact removed (or confirmed absent) and index regenerated.
    Removed { slug: String },
    /// Nothing to do: the item is not published, or nothing addressable
    /// remained to remove.
    Skipped,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to load content record `{id}`: {source}")]
    Fetch {
        id: Uuid,
        #[source]
        source: RepoError,
    },
    #[error("content record `{id}` cannot be rendered: {source}")]
    Render {
        id: Uuid,
        #[source]
        source: TemplateError,
    },
    #[error("content record `{id}` has no derivable slug: {source}")]
    Slug {
        id: Uuid,
        #[source]
        source: SlugError,
    },
    #[error("artifact mutation failed for `{slug}`: {source}")]
    ArtifactWrite {
        slug: String,
        #[source]
        source: ArtifactError,
    },
    /// The artifact reached its end state but the index did not. The
    /// artifact is deliberately not rolled back: regenerating the index is
    /// cheap and idempotent, so the caller retries that alone.
    #[error("artifact for `{slug}` synced but site index regeneration failed: {source}")]
    PartialSync {
        slug: String,
        #[source]
        source: SiteIndexError,
    },
}

#[derive(Clone)]
pub struct PublicationSync {
    content: Arc<dyn ContentRepo>,
    artifacts: Arc<dyn ArtifactStore>,
    site_index: SiteIndexService,
    public_url: String,
}

impl PublicationSync {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        artifacts: Arc<dyn ArtifactStore>,
        site_index: SiteIndexService,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            content,
            artifacts,
            site_index,
            public_url: public_url.into(),
        }
    }

    /// Bring artifact store and site index in line with the triggering
    /// event. Safe to re-invoke with the same event.
    pub async fn apply(&self, event: &PublicationEvent) -> Result<SyncOutcome, SyncError> {
        let outcome = match event {
            PublicationEvent::Published { id } | PublicationEvent::Updated { id } => {
                self.sync_published(*id).await
            }
            PublicationEvent::Unpublished { id } => {
                let slug = self.slug_from_record(*id).await?;
                self.remove(slug).await
            }
            PublicationEvent::Deleted { id, slug } => {
                let slug = match slug {
                    Some(slug) => Some(slug.clone()),
                    None => self.slug_from_record(*id).await?,
                };
                self.remove(slug).await
            }
        };

        match &outcome {
            Ok(SyncOutcome::Synced { slug }) => {
                counter!("folio_sync_success_total").increment(1);
                info!(
                    target = "application::publication",
                    slug = slug,
                    "artifact synced"
                );
            }
            Ok(SyncOutcome::Removed { slug }) => {
                counter!("folio_sync_success_total").increment(1);
                info!(
                    target = "application::publication",
                    slug = slug,
                    "artifact removed"
                );
            }
            Ok(SyncOutcome::Skipped) => {
                debug!(target = "application::publication", "sync skipped");
            }
            Err(err) => {
                counter!("folio_sync_failure_total").increment(1);
                warn!(
                    target = "application::publication",
                    item_id = %event.item_id(),
                    error = %err,
                    "sync failed"
                );
            }
        }

        outcome
    }

    async fn sync_published(&self, id: Uuid) -> Result<SyncOutcome, SyncError> {
        let detail = self
            .content
            .find_detail(id)
            .await
            .map_err(|source| SyncError::Fetch { id, source })?
            .ok_or(SyncError::Fetch {
                id,
                source: RepoError::NotFound,
            })?;

        // Update-while-draft (or while-scheduled) must not create an
        // artifact.
        if detail.item.status != ContentStatus::Published {
            return Ok(SyncOutcome::Skipped);
        }

        let slug = detail
            .item
            .canonical_slug()
            .map_err(|source| SyncError::Slug { id, source })?;
        let canonical = canonical_url(
            &self.public_url,
            &format!("/{}/{}/", detail.category.slug, slug),
        );

        let document = self.render_document(&detail, &canonical).await?;
        let html = document.render();
        let meta = ArtifactMeta {
            slug: slug.clone(),
            canonical_url: canonical,
            description: detail.item.description.clone(),
            image: detail.item.hero_image.clone(),
            checksum: checksum_hex(&html),
            written_at: OffsetDateTime::now_utc(),
        };

        self.artifacts
            .put(&slug, &html, &meta)
            .await
            .map_err(|source| SyncError::ArtifactWrite {
                slug: slug.clone(),
                source,
            })?;

        self.regenerate_index(&slug).await?;
        Ok(SyncOutcome::Synced { slug })
    }

    async fn render_document(
        &self,
        detail: &ContentItemDetail,
        canonical: &str,
    ) -> Result<ArticleDocument, SyncError> {
        // The related and sidebar fragments come from independent queries;
        // either failing degrades that fragment to empty instead of
        // aborting the render.
        let (related, sidebar) = futures::join!(
            self.content
                .list_related(detail.item.category_id, detail.item.id, RELATED_LIMIT),
            self.content.list_recent_cards(SIDEBAR_LIMIT),
        );
        let related = related.unwrap_or_else(|err| {
            warn!(
                target = "application::publication",
                item_id = %detail.item.id,
                error = %err,
                "related query failed, embedding empty fragment"
            );
            Vec::new()
        });
        let sidebar = sidebar.unwrap_or_else(|err| {
            warn!(
                target = "application::publication",
                item_id = %detail.item.id,
                error = %err,
                "sidebar query failed, embedding empty fragment"
            );
            Vec::new()
        });

        ArticleDocument::builder()
            .title(&detail.item.title)
            .description(&detail.item.description)
            .canonical_url(canonical)
            .category(&detail.category.slug, &detail.category.name)
            .published_at(detail.item.published_at)
            .hero_image(detail.item.hero_image.clone())
            .body_html(&detail.item.body_html)
            .tags(detail.tags.iter().map(|t| t.name.clone()).collect())
            .related(related)
            .sidebar(sidebar)
            .build()
            .map_err(|source| SyncError::Render {
                id: detail.item.id,
                source,
            })
    }

    async fn remove(&self, slug: Option<String>) -> Result<SyncOutcome, SyncError> {
        // No record and no slug hint: there is nothing addressable left to
        // remove, and nothing the index could still be advertising under a
        // known name.
        let Some(slug) = slug else {
            return Ok(SyncOutcome::Skipped);
        };

        let removed = self
            .artifacts
            .delete(&slug)
            .await
            .map_err(|source| SyncError::ArtifactWrite {
                slug: slug.clone(),
                source,
            })?;
        if !removed {
            debug!(
                target = "application::publication",
                slug = slug,
                "no artifact to remove"
            );
        }

        self.regenerate_index(&slug).await?;
        Ok(SyncOutcome::Removed { slug })
    }

    async fn slug_from_record(&self, id: Uuid) -> Result<Option<String>, SyncError> {
        let record = self
            .content
            .find_by_id(id)
            .await
            .map_err(|source| SyncError::Fetch { id, source })?;
        match record {
            Some(item) => match item.canonical_slug() {
                Ok(slug) => Ok(Some(slug)),
                // An item that never had an addressable slug never had an
                // artifact either.
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    async fn regenerate_index(&self, slug: &str) -> Result<(), SyncError> {
        self.site_index.regenerate().await.map(drop).map_err(|source| {
            counter!("folio_sync_partial_total").increment(1);
            SyncError::PartialSync {
                slug: slug.to_string(),
                source,
            }
        })
    }
}
