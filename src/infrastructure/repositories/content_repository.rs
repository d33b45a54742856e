//! Content Repository Implementation
//!
//! PostgreSQL random sampling of listings with their photos, localized
//! category and city names, author and hashtags loaded in one round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ContentAuthor, ContentRecord, ContentRepository};
use crate::shared::error::AppError;

/// PostgreSQL content repository implementation.
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Creates a new PgContentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sampled listings.
#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: i64,
    title: String,
    description: String,
    slug: String,
    lang: String,
    total: f64,
    photos: Vec<String>,
    categories: Vec<String>,
    cities: Vec<String>,
    author_id: Uuid,
    author_name: String,
    author_avatar: Option<String>,
    hashtags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_record(self) -> ContentRecord {
        ContentRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            slug: self.slug,
            lang: self.lang,
            total: self.total,
            photos: self.photos,
            categories: self.categories,
            cities: self.cities,
            author: ContentAuthor {
                id: self.author_id,
                name: self.author_name,
                avatar: self.author_avatar.filter(|a| !a.is_empty()),
            },
            hashtags: self.hashtags,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    /// Sample `count` live listings at random.
    ///
    /// Category and city names fall back to their default name when no
    /// translation exists for `locale`.
    async fn fetch_random(
        &self,
        count: usize,
        locale: &str,
    ) -> Result<Vec<ContentRecord>, AppError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT b.id::int8 AS id,
                   b.title,
                   b.descr AS description,
                   b.slug,
                   b.lang,
                   COALESCE(b.total, 0)::float8 AS total,
                   ARRAY(
                       SELECT p.path FROM blog_photos p
                       WHERE p.blog_id = b.id ORDER BY p.id
                   ) AS photos,
                   ARRAY(
                       SELECT COALESCE(g.translations ->> $2, g.name)
                       FROM blog_guilds bg JOIN guilds g ON g.id = bg.guilds_id
                       WHERE bg.blog_id = b.id
                   ) AS categories,
                   ARRAY(
                       SELECT COALESCE(c.translations ->> $2, c.name)
                       FROM blog_city bc JOIN cities c ON c.id = bc.city_id
                       WHERE bc.blog_id = b.id
                   ) AS cities,
                   u.id AS author_id,
                   u.name AS author_name,
                   NULLIF(b.user_avatar, '') AS author_avatar,
                   ARRAY(
                       SELECT h.hashtag
                       FROM blog_hashtags bh JOIN hashtags h ON h.id = bh.hashtags_id
                       WHERE bh.blog_id = b.id
                   ) AS hashtags,
                   b.created_at
            FROM blogs b
            JOIN users u ON u.id = b.user_id
            WHERE b.deleted_at IS NULL
              AND (b.expired_at IS NULL OR b.expired_at > NOW())
            ORDER BY random()
            LIMIT $1
            "#,
        )
        .bind(count as i64)
        .bind(locale)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::Unavailable("content database".to_string())
            }
            other => AppError::Database(other),
        })?;

        tracing::trace!(count = rows.len(), locale = %locale, "Sampled content");

        Ok(rows.into_iter().map(ContentRow::into_record).collect())
    }
}
