//! News provider client.
//!
//! Fetches top headlines from a NewsAPI-style endpoint and shapes them into
//! [`Article`]s carrying the dedup key the repository uses to skip
//! already-seen stories.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use newsreel_models::Article;

use crate::error::{http_error, status_error, PipelineError, PipelineResult};

const SERVICE: &str = "news";

/// Filters for a headline fetch.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilters {
    pub country: Option<String>,
    pub category: Option<String>,
    pub page_size: u32,
}

impl ArticleFilters {
    pub fn new(page_size: u32) -> Self {
        Self {
            country: None,
            category: None,
            page_size,
        }
    }
}

/// News provider configuration.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: String,
    pub base_url: String,
}

impl NewsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        Ok(Self {
            api_key: std::env::var("NEWS_API_KEY")
                .map_err(|_| PipelineError::config_error("NEWS_API_KEY not set"))?,
            base_url: std::env::var("NEWS_BASE_URL")
                .unwrap_or_else(|_| "https://newsapi.org/v2".to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    source: RawSource,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    name: Option<String>,
}

/// News provider HTTP client.
pub struct NewsClient {
    config: NewsConfig,
    client: Client,
}

impl NewsClient {
    /// Create a new client.
    pub fn new(config: NewsConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::config_error(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> PipelineResult<Self> {
        Self::new(NewsConfig::from_env()?)
    }

    /// Fetch top headlines matching the filters.
    pub async fn fetch(&self, filters: &ArticleFilters) -> PipelineResult<Vec<Article>> {
        let mut query: Vec<(&str, String)> = vec![
            ("language", "en".to_string()),
            ("pageSize", filters.page_size.to_string()),
        ];
        if let Some(ref category) = filters.category {
            query.push(("category", category.clone()));
        }
        if let Some(ref country) = filters.country {
            query.push(("country", country.clone()));
        }

        let response = self
            .client
            .get(format!("{}/top-headlines", self.config.base_url))
            .header("X-API-Key", &self.config.api_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(SERVICE, status, body));
        }

        let parsed: HeadlinesResponse =
            response.json().await.map_err(|e| http_error(SERVICE, e))?;

        if parsed.status == "error" {
            return Err(PipelineError::fatal(
                SERVICE,
                parsed.message.unwrap_or_else(|| "unknown provider error".to_string()),
            ));
        }

        let articles: Vec<Article> = parsed
            .articles
            .into_iter()
            .filter_map(|raw| self.shape_article(raw, filters.category.clone()))
            .collect();

        debug!("Fetched {} usable articles", articles.len());
        Ok(articles)
    }

    fn shape_article(&self, raw: RawArticle, category: Option<String>) -> Option<Article> {
        if raw.title.is_empty() {
            return None;
        }

        // Providers truncate `content` as "text… [+1234 chars]"; drop the
        // marker and the ellipsis so neither gets narrated.
        let mut content = raw
            .content
            .or(raw.description)
            .unwrap_or_default()
            .trim()
            .to_string();
        if content.ends_with("chars]") {
            if let Some(idx) = content.rfind("[+") {
                content.truncate(idx);
            }
        }
        let content = content.trim_end().trim_end_matches('…').trim_end().to_string();
        if content.is_empty() {
            return None;
        }

        let source = raw.source.name.unwrap_or_else(|| "Unknown".to_string());
        let published_at = raw
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| {
                warn!("Article {:?} has no parseable publishedAt", raw.title);
                Utc::now()
            });

        Some(Article::new(raw.title, content, source, published_at, category))
    }
}
