//! Content record entity and repository trait.
//!
//! A content record is one marketplace listing with its preloaded
//! associations, as pushed to live viewers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Listing author summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAuthor {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A listing with photos, localized category and city names, author and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub lang: String,
    pub total: f64,
    pub photos: Vec<String>,
    pub categories: Vec<String>,
    pub cities: Vec<String>,
    pub author: ContentAuthor,
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Source of randomly sampled content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch up to `count` random records with names localized to `locale`.
    async fn fetch_random(&self, count: usize, locale: &str)
        -> Result<Vec<ContentRecord>, AppError>;
}

#[cfg(test)]
impl ContentRecord {
    /// Minimal record for unit tests
    pub fn fixture(id: i64) -> Self {
        Self {
            id,
            title: format!("Listing {}", id),
            description: "Two-room flat near the station".to_string(),
            slug: format!("listing-{}", id),
            lang: "en".to_string(),
            total: 120.5,
            photos: vec![format!("/uploads/{}/1.jpg", id)],
            categories: vec!["Apartments".to_string()],
            cities: vec!["Tbilisi".to_string()],
            author: ContentAuthor {
                id: Uuid::nil(),
                name: "Nino".to_string(),
                avatar: None,
            },
            hashtags: vec!["rent".to_string()],
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
