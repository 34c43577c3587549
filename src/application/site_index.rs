//! Site index regeneration and robots.txt.
//!
//! The index is a derived document: on every publication-affecting event it
//! is rebuilt wholesale from the content store plus any orphaned artifacts,
//! then written to the artifact store under the reserved index key. It is
//! never patched incrementally, so it can drift only between triggering
//! events, never within one.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;
use uuid::Uuid;

use crate::application::artifacts::ArtifactStore;
use crate::application::repos::{CategoriesRepo, ContentRepo};
use crate::domain::entities::CategoryRecord;
use crate::domain::types::ChangeFrequency;

const WALK_BATCH_SIZE: u32 = 200;

#[derive(Debug, Error)]
pub enum SiteIndexError {
    #[error("failed to list content: {0}")]
    Content(String),
    #[error("failed to list categories: {0}")]
    Categories(String),
    #[error("failed to access artifact store: {0}")]
    Store(#[from] crate::application::artifacts::ArtifactError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteIndexEntry {
    pub loc: String,
    pub last_modified: Option<OffsetDateTime>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

#[derive(Clone)]
pub struct SiteIndexService {
    content: Arc<dyn ContentRepo>,
    categories: Arc<dyn CategoriesRepo>,
    artifacts: Arc<dyn ArtifactStore>,
    public_url: String,
    utility_pages: Vec<String>,
}

impl SiteIndexService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        categories: Arc<dyn CategoriesRepo>,
        artifacts: Arc<dyn ArtifactStore>,
        public_url: impl Into<String>,
        utility_pages: Vec<String>,
    ) -> Self {
        Self {
            content,
            categories,
            artifacts,
            public_url: normalize_public_url(&public_url.into()),
            utility_pages,
        }
    }

    /// Rebuild the index from scratch and persist it. Returns the XML that
    /// was written.
    pub async fn regenerate(&self) -> Result<String, SiteIndexError> {
        let entries = self.collect_entries().await?;
        let xml = render_index(&entries);
        self.artifacts.put_index(&xml).await?;
        Ok(xml)
    }

    /// The stored index, regenerating it on demand when absent.
    pub async fn current_or_regenerate(&self) -> Result<String, SiteIndexError> {
        if let Some(xml) = self.artifacts.get_index().await? {
            return Ok(xml);
        }
        self.regenerate().await
    }

    pub fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nAllow: /\nSitemap: {}sitemap.xml\n",
            self.public_url
        )
    }

    async fn collect_entries(&self) -> Result<Vec<SiteIndexEntry>, SiteIndexError> {
        let categories = self
            .categories
            .list_in_use()
            .await
            .map_err(|e| SiteIndexError::Categories(e.to_string()))?;
        let by_id: HashMap<Uuid, &CategoryRecord> =
            categories.iter().map(|c| (c.id, c)).collect();

        let mut entries = Vec::new();

        entries.push(SiteIndexEntry {
            loc: self.url("/"),
            last_modified: None,
            change_frequency: ChangeFrequency::Daily,
            priority: 1.0,
        });

        for page in &self.utility_pages {
            entries.push(SiteIndexEntry {
                loc: self.url(&format!("/{}/", page.trim_matches('/'))),
                last_modified: None,
                change_frequency: ChangeFrequency::Monthly,
                priority: 0.3,
            });
        }

        for category in &categories {
            entries.push(SiteIndexEntry {
                loc: self.url(&format!("/{}/", category.slug)),
                last_modified: None,
                change_frequency: ChangeFrequency::Weekly,
                priority: 0.6,
            });
        }

        // Every published item, walked in bounded batches.
        let mut item_slugs = BTreeSet::new();
        let mut offset = 0;
        loop {
            let batch = self
                .content
                .list_published_page(WALK_BATCH_SIZE, offset)
                .await
                .map_err(|e| SiteIndexError::Content(e.to_string()))?;
            let batch_len = batch.len() as u32;

            for item in batch {
                let slug = match item.canonical_slug() {
                    Ok(slug) => slug,
                    Err(err) => {
                        warn!(
                            target = "application::site_index",
                            item_id = %item.id,
                            error = %err,
                            "skipping item with underivable slug"
                        );
                        continue;
                    }
                };
                let Some(category) = by_id.get(&item.category_id) else {
                    warn!(
                        target = "application::site_index",
                        item_id = %item.id,
                        slug = slug,
                        "skipping item with unknown category"
                    );
                    continue;
                };
                entries.push(SiteIndexEntry {
                    loc: self.url(&format!("/{}/{}/", category.slug, slug)),
                    last_modified: Some(item.last_modified()),
                    change_frequency: ChangeFrequency::Weekly,
                    priority: 0.8,
                });
                item_slugs.insert(slug);
            }

            if batch_len < WALK_BATCH_SIZE {
                break;
            }
            offset += WALK_BATCH_SIZE;
        }

        // Artifacts with no matching content record still have live URLs.
        for slug in self.artifacts.list_slugs().await? {
            if !item_slugs.contains(&slug) {
                entries.push(SiteIndexEntry {
                    loc: self.url(&format!("/{slug}/")),
                    last_modified: None,
                    change_frequency: ChangeFrequency::Monthly,
                    priority: 0.5,
                });
            }
        }

        Ok(entries)
    }

    fn url(&self, path: &str) -> String {
        canonical_url(&self.public_url, path)
    }
}

pub fn normalize_public_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

pub fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        format!("{base}/")
    } else {
        format!("{base}{path}")
    }
}

fn render_index(entries: &[SiteIndexEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        let _ = write!(xml, "  <url><loc>{}</loc>", entry.loc);
        if let Some(lastmod) = entry.last_modified.and_then(|dt| dt.format(&Rfc3339).ok()) {
            let _ = write!(xml, "<lastmod>{lastmod}</lastmod>");
        }
        let _ = writeln!(
            xml,
            "<changefreq>{}</changefreq><priority>{:.1}</priority></url>",
            entry.change_frequency.as_str(),
            entry.priority
        );
    }
    xml.push_str("</urlset>\n");
    xml
}
