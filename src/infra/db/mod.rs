//! Postgres adapter for the authoritative content store.
//!
//! Read-only by design: the authoring collaborator owns every write to
//! these tables, this process only projects them into artifacts, the site
//! index and snapshot payloads.

use sqlx::FromRow;
use sqlx::postgres::{PgPool, PgPoolOptions};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CategoriesRepo, ContentRepo, RepoError};
use crate::domain::entities::{
    CategoryRecord, ContentCard, ContentItemDetail, ContentItemRecord, TagRecord,
};
use crate::domain::slug::derive_slug;
use crate::domain::types::ContentStatus;

const ITEM_COLUMNS: &str = "id, title, slug, description, body_html, hero_image, category_id, \
     status, scheduled_at, published_at, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresContentStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ContentItemRow {
    id: Uuid,
    title: String,
    slug: Option<String>,
    description: String,
    body_html: String,
    hero_image: Option<String>,
    category_id: Uuid,
    status: ContentStatus,
    scheduled_at: Option<OffsetDateTime>,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContentItemRow> for ContentItemRecord {
    fn from(row: ContentItemRow) -> Self {
        ContentItemRecord {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            body_html: row.body_html,
            hero_image: row.hero_image,
            category_id: row.category_id,
            status: row.status,
            scheduled_at: row.scheduled_at,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CardRow {
    id: Uuid,
    title: String,
    slug: Option<String>,
    description: String,
    hero_image: Option<String>,
    category_slug: String,
    published_at: Option<OffsetDateTime>,
}

impl CardRow {
    fn into_card(self) -> Option<ContentCard> {
        let slug = match self.slug.filter(|s| !s.trim().is_empty()) {
            Some(slug) => slug,
            None => derive_slug(&self.title).ok()?,
        };
        Some(ContentCard {
            id: self.id,
            title: self.title,
            slug,
            description: self.description,
            hero_image: self.hero_image,
            category_slug: self.category_slug,
            published_at: self.published_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: Uuid,
    slug: String,
    name: String,
}

#[derive(FromRow)]
struct TagRow {
    id: Uuid,
    slug: String,
    name: String,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        CategoryRecord {
            id: row.id,
            slug: row.slug,
            name: row.name,
        }
    }
}

fn map_sqlx(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

impl PostgresContentStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepoError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(map_sqlx)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cheap liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn list_tags_for(&self, item_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT t.id, t.slug, t.name
               FROM tags t
               JOIN content_item_tags it ON it.tag_id = t.id
              WHERE it.content_item_id = $1
              ORDER BY t.name",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| TagRecord {
                id: row.id,
                slug: row.slug,
                name: row.name,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ContentRepo for PostgresContentStore {
    async fn ping(&self) -> Result<(), RepoError> {
        PostgresContentStore::ping(self).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError> {
        let row: Option<ContentItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM content_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentItemRecord>, RepoError> {
        let row: Option<ContentItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM content_items WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ContentItemDetail>, RepoError> {
        let Some(item) = ContentRepo::find_by_id(self, id).await? else {
            return Ok(None);
        };

        let category: Option<CategoryRow> =
            sqlx::query_as("SELECT id, slug, name FROM categories WHERE id = $1")
                .bind(item.category_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        let Some(category) = category else {
            return Err(RepoError::from_persistence(format!(
                "content item `{id}` references missing category"
            )));
        };

        let tags = self.list_tags_for(id).await?;

        Ok(Some(ContentItemDetail {
            item,
            category: category.into(),
            tags,
        }))
    }

    async fn list_recent_published(
        &self,
        limit: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError> {
        self.list_published_page(limit, 0).await
    }

    async fn list_published_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError> {
        let rows: Vec<ContentItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM content_items
              WHERE status = 'published'
              ORDER BY published_at DESC NULLS LAST, updated_at DESC
              LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_related(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: u32,
    ) -> Result<Vec<ContentCard>, RepoError> {
        let rows: Vec<CardRow> = sqlx::query_as(
            "SELECT i.id, i.title, i.slug, i.description, i.hero_image,
                    c.slug AS category_slug, i.published_at
               FROM content_items i
               JOIN categories c ON c.id = i.category_id
              WHERE i.status = 'published' AND i.category_id = $1 AND i.id <> $2
              ORDER BY i.published_at DESC NULLS LAST
              LIMIT $3",
        )
        .bind(category_id)
        .bind(exclude)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().filter_map(CardRow::into_card).collect())
    }

    async fn list_recent_cards(&self, limit: u32) -> Result<Vec<ContentCard>, RepoError> {
        let rows: Vec<CardRow> = sqlx::query_as(
            "SELECT i.id, i.title, i.slug, i.description, i.hero_image,
                    c.slug AS category_slug, i.published_at
               FROM content_items i
               JOIN categories c ON c.id = i.category_id
              WHERE i.status = 'published'
              ORDER BY i.published_at DESC NULLS LAST
              LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().filter_map(CardRow::into_card).collect())
    }

    async fn list_cards_in_category(
        &self,
        category_slug: &str,
        limit: u32,
    ) -> Result<Vec<ContentCard>, RepoError> {
        let rows: Vec<CardRow> = sqlx::query_as(
            "SELECT i.id, i.title, i.slug, i.description, i.hero_image,
                    c.slug AS category_slug, i.published_at
               FROM content_items i
               JOIN categories c ON c.id = i.category_id
              WHERE i.status = 'published' AND c.slug = $1
              ORDER BY i.published_at DESC NULLS LAST
              LIMIT $2",
        )
        .bind(category_slug)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().filter_map(CardRow::into_card).collect())
    }
}

#[async_trait::async_trait]
impl CategoriesRepo for PostgresContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, slug, name FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, slug, name FROM categories WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn list_in_use(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT DISTINCT c.id, c.slug, c.name
               FROM categories c
               JOIN content_items i ON i.category_id = c.id
              WHERE i.status = 'published'
              ORDER BY c.slug",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
