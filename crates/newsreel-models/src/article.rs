//! Article model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique article identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A news article, the immutable source material for a reel.
///
/// Articles are deduplicated on `dedup_key` (title + source); once created
/// they are never mutated except for the `consumed` flag, which flips when
/// the pipeline picks the article up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    /// Headline.
    pub title: String,
    /// Full article text.
    pub content: String,
    /// Source name (e.g. "BBC News").
    pub source: String,
    /// Original publication timestamp from the provider.
    pub published_at: DateTime<Utc>,
    /// Provider category, if any (e.g. "technology").
    pub category: Option<String>,
    /// Deduplication key, `"{title}||{source}"`.
    pub dedup_key: String,
    /// Whether the pipeline has already used this article.
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Build an article with its dedup key derived from title and source.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        published_at: DateTime<Utc>,
        category: Option<String>,
    ) -> Self {
        let title = title.into();
        let source = source.into();
        let dedup_key = Self::dedup_key_for(&title, &source);
        Self {
            id: ArticleId::new(),
            title,
            content: content.into(),
            source,
            published_at,
            category,
            dedup_key,
            consumed: false,
            created_at: Utc::now(),
        }
    }

    /// Dedup key shared by the fetch path and the persistence layer.
    /// `||` keeps title and source visually distinguishable.
    pub fn dedup_key_for(title: &str, source: &str) -> String {
        format!("{}||{}", title, source)
    }
}
