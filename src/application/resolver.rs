//! Tiered slug resolution.
//!
//! An inbound path segment is resolved through an ordered chain that
//! short-circuits on first success and never dead-ends in a hard failure
//! for a plausibly valid content path:
//!
//! 1. exact artifact lookup by the raw segment;
//! 2. deterministic slug variations (case, separator swaps);
//! 3. a bounded scan of recently published items in the content store,
//!    matching each candidate's canonical slug under normalization;
//! 4. a short-lived 307 redirect to the article shell, which resolves
//!    content live and tolerates a miss itself.
//!
//! Only a failing lookup call surfaces as an error, never absent content.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::artifacts::{ArtifactError, ArtifactStore, StoredArtifact};
use crate::application::repos::{ContentRepo, RepoError};
use crate::application::template::rewrite_canonical;
use crate::domain::slug::{matches_normalized, normalize, variations};
use crate::util::lock::mutex_lock;

const SOURCE: &str = "application::resolver";
const MEMO_CAPACITY: usize = 512;

/// Path of the dynamic rendering shell redirects point at.
pub const ARTICLE_SHELL_PATH: &str = "/article";

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The lookup call itself failed. Distinct from "content does not
    /// exist", which always resolves to a redirect instead.
    #[error("upstream {stage} lookup failed for `{slug}`: {source}")]
    Upstream {
        slug: String,
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ResolveError {
    fn artifact(slug: &str, source: ArtifactError) -> Self {
        Self::Upstream {
            slug: slug.to_string(),
            stage: "artifact-store",
            source: Box::new(source),
        }
    }

    fn content(slug: &str, source: RepoError) -> Self {
        Self::Upstream {
            slug: slug.to_string(),
            stage: "content-store",
            source: Box::new(source),
        }
    }
}

/// A servable response for an inbound path segment.
#[derive(Debug, Clone)]
pub enum Resolution {
    Document {
        html: String,
        canonical_url: String,
        etag: String,
        /// Whether the canonical tag lives in the document itself; when it
        /// does not, the transport layer advertises it via a `Link` header.
        canonical_in_document: bool,
    },
    Redirect {
        location: String,
        max_age: Duration,
    },
}

#[derive(Clone)]
pub struct ResolverConfig {
    /// Upper bound on the content-store candidate scan.
    pub candidate_batch_limit: u32,
    /// Cache lifetime advertised on miss redirects.
    pub redirect_max_age: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidate_batch_limit: 50,
            redirect_max_age: Duration::from_secs(60),
        }
    }
}

pub struct SlugResolver {
    content: Arc<dyn ContentRepo>,
    artifacts: Arc<dyn ArtifactStore>,
    config: ResolverConfig,
    /// Requested segment → artifact slug hints from earlier variation
    /// scans. Hints only skip the variation walk; every hit is re-validated
    /// against the artifact store, so an unpublished artifact is never
    /// served from here.
    memo: Mutex<LruCache<String, String>>,
}

impl SlugResolver {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        artifacts: Arc<dyn ArtifactStore>,
        config: ResolverConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(MEMO_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            content,
            artifacts,
            config,
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn resolve(&self, raw: &str) -> Result<Resolution, ResolveError> {
        // Memoized variation hit from an earlier request.
        if let Some(hint) = self.memo_get(raw) {
            match self.fetch(&hint).await? {
                Some(stored) => {
                    counter!("folio_resolver_memo_hit_total").increment(1);
                    return Ok(self.serve(stored));
                }
                None => self.memo_drop(raw),
            }
        }

        // Tier 1: exact artifact lookup.
        if let Some(stored) = self.fetch(raw).await? {
            counter!("folio_resolver_exact_hit_total").increment(1);
            return Ok(self.serve(stored));
        }

        // Tier 2: deterministic variations.
        for candidate in variations(raw) {
            if let Some(stored) = self.fetch(&candidate).await? {
                counter!("folio_resolver_variant_hit_total").increment(1);
                self.memo_put(raw, &candidate);
                return Ok(self.serve(stored));
            }
        }

        // Tier 3: bounded candidate scan of the content store.
        let candidates = self
            .content
            .list_recent_published(self.config.candidate_batch_limit)
            .await
            .map_err(|err| ResolveError::content(raw, err))?;
        for item in candidates {
            let Ok(canonical) = item.canonical_slug() else {
                continue;
            };
            if matches_normalized(raw, &canonical) {
                // The record exists but no artifact does; the shell
                // re-resolves live and renders the result.
                counter!("folio_resolver_record_hit_total").increment(1);
                debug!(
                    target = SOURCE,
                    requested = raw,
                    slug = canonical,
                    "record matched without artifact, redirecting to shell"
                );
                return Ok(Resolution::Redirect {
                    location: format!(
                        "{ARTICLE_SHELL_PATH}?slug={canonical}&id={}",
                        item.id
                    ),
                    max_age: self.config.redirect_max_age,
                });
            }
        }

        // Tier 4: nothing matched; the shell owns the final answer. It
        // renders an empty state on a true miss, so this is never a 404.
        counter!("folio_resolver_shell_fallback_total").increment(1);
        Ok(Resolution::Redirect {
            location: format!("{ARTICLE_SHELL_PATH}?slug={}", normalize(raw)),
            max_age: self.config.redirect_max_age,
        })
    }

    async fn fetch(&self, slug: &str) -> Result<Option<StoredArtifact>, ResolveError> {
        self.artifacts
            .get(slug)
            .await
            .map_err(|err| ResolveError::artifact(slug, err))
    }

    fn serve(&self, stored: StoredArtifact) -> Resolution {
        let canonical = stored.meta.canonical_url.clone();
        let (html, canonical_in_document) =
            match rewrite_canonical(&stored.document, &canonical) {
                Ok((html, touched)) => (html, touched),
                Err(err) => {
                    // Serve the document as stored; the transport layer
                    // falls back to a Link header for the canonical.
                    warn!(
                        target = SOURCE,
                        slug = stored.meta.slug,
                        error = %err,
                        "canonical rewrite failed, serving stored document"
                    );
                    (stored.document, false)
                }
            };
        Resolution::Document {
            html,
            canonical_url: canonical,
            etag: stored.meta.checksum,
            canonical_in_document,
        }
    }

    fn memo_get(&self, raw: &str) -> Option<String> {
        mutex_lock(&self.memo, SOURCE, "memo_get")
            .get(raw)
            .cloned()
    }

    fn memo_put(&self, raw: &str, slug: &str) {
        mutex_lock(&self.memo, SOURCE, "memo_put").put(raw.to_string(), slug.to_string());
    }

    fn memo_drop(&self, raw: &str) {
        mutex_lock(&self.memo, SOURCE, "memo_drop").pop(raw);
    }
}
