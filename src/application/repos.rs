//! Repository traits describing the authoritative content store.
//!
//! The content store is an external collaborator: the authoring side owns
//! every write, so the traits here are read-only. Implementations live in
//! `infra::db` (Postgres) and in test fakes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CategoryRecord, ContentCard, ContentItemDetail, ContentItemRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Cheap liveness probe for health reporting.
    async fn ping(&self) -> Result<(), RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentItemRecord>, RepoError>;

    /// The item joined with its category and tags, as a full render needs it.
    async fn find_detail(&self, id: Uuid) -> Result<Option<ContentItemDetail>, RepoError>;

    /// Published items, most recent first, bounded by `limit`.
    async fn list_recent_published(
        &self,
        limit: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError>;

    /// One page of published items, most recent first. Used by whole-site
    /// walks (index regeneration) that must cover every published item in
    /// bounded batches.
    async fn list_published_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError>;

    /// Cards for published items sharing a category, excluding one item.
    async fn list_related(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: u32,
    ) -> Result<Vec<ContentCard>, RepoError>;

    /// Cards for the most recently published items.
    async fn list_recent_cards(&self, limit: u32) -> Result<Vec<ContentCard>, RepoError>;

    /// Cards for published items in the named category.
    async fn list_cards_in_category(
        &self,
        category_slug: &str,
        limit: u32,
    ) -> Result<Vec<ContentCard>, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    /// Categories that currently have at least one published item.
    async fn list_in_use(&self) -> Result<Vec<CategoryRecord>, RepoError>;
}
