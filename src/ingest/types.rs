// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One fetched article. `url` is the identity key for dedup and history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub published: DateTime<Utc>,
    pub source: String,      // e.g., "Hacker News", "Publickey"
    pub description: String, // normalized text, may be empty
    #[serde(default)]
    pub score: i64, // source-specific (HN points), 0 otherwise
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        published: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published,
            source: source.into(),
            description: String::new(),
            score: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<NewsItem>>;
    fn source_name(&self) -> &str;
}
