//! In-memory store fakes and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use folio::application::artifacts::{ArtifactError, ArtifactStore, StoredArtifact};
use folio::application::publication::PublicationSync;
use folio::application::repos::{CategoriesRepo, ContentRepo, RepoError};
use folio::application::resolver::{ResolverConfig, SlugResolver};
use folio::application::site_index::SiteIndexService;
use folio::cache::{CacheConfig, Surfaces};
use folio::domain::entities::{
    ArtifactMeta, CategoryRecord, ContentCard, ContentItemDetail, ContentItemRecord, TagRecord,
};
use folio::domain::types::ContentStatus;
use folio::infra::http::{HttpState, NavigationPolicy, build_router};
use folio::presentation::views::SiteChrome;

pub const PUBLIC_URL: &str = "https://example.com";

fn io_failure(what: &str) -> ArtifactError {
    ArtifactError::Io(std::io::Error::other(what.to_string()))
}

// ============================================================================
// Content store fake
// ============================================================================

#[derive(Default)]
pub struct InMemoryContentStore {
    items: Mutex<HashMap<Uuid, ContentItemRecord>>,
    categories: Mutex<HashMap<Uuid, CategoryRecord>>,
    tags: Mutex<HashMap<Uuid, Vec<TagRecord>>>,
    /// Fail only the auxiliary related query, to exercise degradation.
    pub fail_related: AtomicBool,
    /// Fail every query, to exercise upstream-failure paths.
    pub fail_all: AtomicBool,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_category(&self, category: CategoryRecord) {
        self.categories
            .lock()
            .unwrap()
            .insert(category.id, category);
    }

    pub fn insert_item(&self, item: ContentItemRecord) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub fn insert_tags(&self, item_id: Uuid, tags: Vec<TagRecord>) {
        self.tags.lock().unwrap().insert(item_id, tags);
    }

    pub fn remove_item(&self, id: Uuid) {
        self.items.lock().unwrap().remove(&id);
    }

    pub fn set_status(&self, id: Uuid, status: ContentStatus) {
        if let Some(item) = self.items.lock().unwrap().get_mut(&id) {
            item.status = status;
        }
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(RepoError::from_persistence("content store unreachable"))
        } else {
            Ok(())
        }
    }

    fn published(&self) -> Vec<ContentItemRecord> {
        let mut items: Vec<ContentItemRecord> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.status == ContentStatus::Published)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
        items
    }

    fn card_for(&self, item: &ContentItemRecord) -> Option<ContentCard> {
        let categories = self.categories.lock().unwrap();
        let category = categories.get(&item.category_id)?;
        Some(ContentCard {
            id: item.id,
            title: item.title.clone(),
            slug: item.canonical_slug().ok()?,
            description: item.description.clone(),
            hero_image: item.hero_image.clone(),
            category_slug: category.slug.clone(),
            published_at: item.published_at,
        })
    }
}

#[async_trait]
impl ContentRepo for InMemoryContentStore {
    async fn ping(&self) -> Result<(), RepoError> {
        self.check()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError> {
        self.check()?;
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentItemRecord>, RepoError> {
        self.check()?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .find(|item| item.slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ContentItemDetail>, RepoError> {
        self.check()?;
        let Some(item) = self.items.lock().unwrap().get(&id).cloned() else {
            return Ok(None);
        };
        let category = self
            .categories
            .lock()
            .unwrap()
            .get(&item.category_id)
            .cloned()
            .ok_or_else(|| RepoError::from_persistence("missing category"))?;
        let tags = self
            .tags
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default();
        Ok(Some(ContentItemDetail {
            item,
            category,
            tags,
        }))
    }

    async fn list_recent_published(
        &self,
        limit: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError> {
        self.check()?;
        Ok(self.published().into_iter().take(limit as usize).collect())
    }

    async fn list_published_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError> {
        self.check()?;
        Ok(self
            .published()
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_related(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: u32,
    ) -> Result<Vec<ContentCard>, RepoError> {
        self.check()?;
        if self.fail_related.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("related query unavailable"));
        }
        Ok(self
            .published()
            .iter()
            .filter(|item| item.category_id == category_id && item.id != exclude)
            .filter_map(|item| self.card_for(item))
            .take(limit as usize)
            .collect())
    }

    async fn list_recent_cards(&self, limit: u32) -> Result<Vec<ContentCard>, RepoError> {
        self.check()?;
        Ok(self
            .published()
            .iter()
            .filter_map(|item| self.card_for(item))
            .take(limit as usize)
            .collect())
    }

    async fn list_cards_in_category(
        &self,
        category_slug: &str,
        limit: u32,
    ) -> Result<Vec<ContentCard>, RepoError> {
        self.check()?;
        Ok(self
            .published()
            .iter()
            .filter_map(|item| self.card_for(item))
            .filter(|card| card.category_slug == category_slug)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        self.check()?;
        Ok(self.categories.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        self.check()?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn list_in_use(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.check()?;
        let used: Vec<Uuid> = self.published().iter().map(|i| i.category_id).collect();
        let mut categories: Vec<CategoryRecord> = self
            .categories
            .lock()
            .unwrap()
            .values()
            .filter(|category| used.contains(&category.id))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(categories)
    }
}

// ============================================================================
// Artifact store fake
// ============================================================================

#[derive(Default)]
pub struct InMemoryArtifactStore {
    documents: Mutex<HashMap<String, StoredArtifact>>,
    index: Mutex<Option<String>>,
    /// Fail index writes, to exercise partial synchronization.
    pub fail_index: AtomicBool,
    /// Fail document reads, to exercise upstream-failure paths.
    pub fail_get: AtomicBool,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, slug: &str) -> Option<String> {
        self.documents
            .lock()
            .unwrap()
            .get(slug)
            .map(|stored| stored.document.clone())
    }

    pub fn index(&self) -> Option<String> {
        self.index.lock().unwrap().clone()
    }

    pub fn seed(&self, slug: &str, document: &str, meta: ArtifactMeta) {
        self.documents.lock().unwrap().insert(
            slug.to_string(),
            StoredArtifact {
                document: document.to_string(),
                meta,
            },
        );
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(
        &self,
        slug: &str,
        document: &str,
        meta: &ArtifactMeta,
    ) -> Result<(), ArtifactError> {
        if !valid_key(slug) {
            return Err(ArtifactError::InvalidKey {
                key: slug.to_string(),
            });
        }
        self.documents.lock().unwrap().insert(
            slug.to_string(),
            StoredArtifact {
                document: document.to_string(),
                meta: meta.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Option<StoredArtifact>, ArtifactError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(io_failure("artifact store unreachable"));
        }
        if !valid_key(slug) {
            return Ok(None);
        }
        Ok(self.documents.lock().unwrap().get(slug).cloned())
    }

    async fn delete(&self, slug: &str) -> Result<bool, ArtifactError> {
        if !valid_key(slug) {
            return Err(ArtifactError::InvalidKey {
                key: slug.to_string(),
            });
        }
        Ok(self.documents.lock().unwrap().remove(slug).is_some())
    }

    async fn list_slugs(&self) -> Result<Vec<String>, ArtifactError> {
        let mut slugs: Vec<String> = self.documents.lock().unwrap().keys().cloned().collect();
        slugs.sort();
        Ok(slugs)
    }

    async fn put_index(&self, xml: &str) -> Result<(), ArtifactError> {
        if self.fail_index.load(Ordering::SeqCst) {
            return Err(io_failure("index write refused"));
        }
        *self.index.lock().unwrap() = Some(xml.to_string());
        Ok(())
    }

    async fn get_index(&self) -> Result<Option<String>, ArtifactError> {
        Ok(self.index.lock().unwrap().clone())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn category(slug: &str, name: &str) -> CategoryRecord {
    CategoryRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: name.to_string(),
    }
}

pub fn published_item(title: &str, category: &CategoryRecord) -> ContentItemRecord {
    ContentItemRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: None,
        description: format!("{title} described"),
        body_html: format!("<p>{title} body</p>"),
        hero_image: Some("https://cdn.example.com/hero.jpg".to_string()),
        category_id: category.id,
        status: ContentStatus::Published,
        scheduled_at: None,
        published_at: Some(datetime!(2026-03-01 12:00 UTC)),
        created_at: datetime!(2026-02-01 09:00 UTC),
        updated_at: datetime!(2026-03-01 12:00 UTC),
    }
}

pub fn draft_item(title: &str, category: &CategoryRecord) -> ContentItemRecord {
    ContentItemRecord {
        status: ContentStatus::Draft,
        published_at: None,
        ..published_item(title, category)
    }
}

pub fn artifact_meta(slug: &str, document: &str) -> ArtifactMeta {
    ArtifactMeta {
        slug: slug.to_string(),
        canonical_url: format!("{PUBLIC_URL}/guides/{slug}/"),
        description: "seeded".to_string(),
        image: None,
        checksum: folio::application::artifacts::checksum_hex(document),
        written_at: OffsetDateTime::now_utc(),
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub struct TestContext {
    pub content: Arc<InMemoryContentStore>,
    pub artifacts: Arc<InMemoryArtifactStore>,
    pub site_index: SiteIndexService,
    pub publication: PublicationSync,
    pub surfaces: Surfaces,
}

impl TestContext {
    pub fn new() -> Self {
        let content = Arc::new(InMemoryContentStore::new());
        let artifacts = Arc::new(InMemoryArtifactStore::new());
        let site_index = SiteIndexService::new(
            Arc::clone(&content) as Arc<dyn ContentRepo>,
            Arc::clone(&content) as Arc<dyn CategoriesRepo>,
            Arc::clone(&artifacts) as Arc<dyn ArtifactStore>,
            PUBLIC_URL,
            vec!["about".to_string(), "contact".to_string()],
        );
        let publication = PublicationSync::new(
            Arc::clone(&content) as Arc<dyn ContentRepo>,
            Arc::clone(&artifacts) as Arc<dyn ArtifactStore>,
            site_index.clone(),
            PUBLIC_URL,
        );
        let surfaces = Surfaces::new(CacheConfig::default());
        Self {
            content,
            artifacts,
            site_index,
            publication,
            surfaces,
        }
    }

    pub fn router(&self) -> axum::Router {
        let resolver = Arc::new(SlugResolver::new(
            Arc::clone(&self.content) as Arc<dyn ContentRepo>,
            Arc::clone(&self.artifacts) as Arc<dyn ArtifactStore>,
            ResolverConfig::default(),
        ));
        let policy = Arc::new(NavigationPolicy::new(vec![
            "about".to_string(),
            "contact".to_string(),
        ]));
        let state = HttpState {
            content: Arc::clone(&self.content) as Arc<dyn ContentRepo>,
            categories: Arc::clone(&self.content) as Arc<dyn CategoriesRepo>,
            resolver,
            publication: self.publication.clone(),
            site_index: self.site_index.clone(),
            surfaces: self.surfaces.clone(),
            policy,
            site: SiteChrome {
                title: "Folio Test".to_string(),
                base_url: PUBLIC_URL.to_string(),
            },
        };
        build_router(state)
    }
}
