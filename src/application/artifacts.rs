//! The artifact store seam: pre-rendered documents addressable by slug.
//!
//! Artifacts exist iff an item was published at least once and has not since
//! been unpublished or deleted. The store also holds the regenerated site
//! index under a reserved key so the artifact-then-index ordering has a
//! durable, observable end state.

use std::fmt::Write as _;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::entities::ArtifactMeta;

/// Reserved key the regenerated site index is stored under. Never listed as
/// a document slug.
pub const SITE_INDEX_KEY: &str = "sitemap.xml";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact key `{key}`")]
    InvalidKey { key: String },
    #[error("artifact storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact metadata corrupted for `{slug}`: {message}")]
    Metadata { slug: String, message: String },
}

/// Lowercase hex SHA-256 of a document, recorded in artifact metadata and
/// served as the ETag.
pub fn checksum_hex(document: &str) -> String {
    let digest = Sha256::digest(document.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// A stored document together with its metadata.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub document: String,
    pub meta: ArtifactMeta,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write or overwrite the document stored under `slug`.
    async fn put(
        &self,
        slug: &str,
        document: &str,
        meta: &ArtifactMeta,
    ) -> Result<(), ArtifactError>;

    async fn get(&self, slug: &str) -> Result<Option<StoredArtifact>, ArtifactError>;

    /// Remove the document stored under `slug`. Returns whether anything was
    /// actually removed; deleting an absent artifact is not an error.
    async fn delete(&self, slug: &str) -> Result<bool, ArtifactError>;

    /// Slugs of every stored document, excluding the reserved index key.
    async fn list_slugs(&self) -> Result<Vec<String>, ArtifactError>;

    /// Overwrite the site index wholesale.
    async fn put_index(&self, xml: &str) -> Result<(), ArtifactError>;

    async fn get_index(&self) -> Result<Option<String>, ArtifactError>;
}
