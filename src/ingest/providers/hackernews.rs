// src/ingest/providers/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{Fetcher, NewsItem};

pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
pub const DEFAULT_TOP_STORIES: usize = 30;
const SOURCE: &str = "Hacker News";

#[derive(Debug, Deserialize)]
pub struct Story {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub time: Option<i64>,
    pub text: Option<String>,
    pub score: Option<i64>,
}

/// Only link stories qualify; Ask HN / jobs / polls have no `url`.
pub fn story_to_item(story: Story) -> Option<NewsItem> {
    if story.kind.as_deref() != Some("story") {
        return None;
    }
    let url = story.url.filter(|u| !u.trim().is_empty())?;
    let title = normalize_text(story.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let published = story
        .time
        .and_then(|t| Utc.timestamp_opt(t, 0).single())
        .unwrap_or_else(Utc::now);
    Some(
        NewsItem::new(title, url, published, SOURCE)
            .with_description(normalize_text(story.text.as_deref().unwrap_or_default()))
            .with_score(story.score.unwrap_or(0)),
    )
}

pub struct HackerNewsFetcher {
    client: reqwest::Client,
    api_base: String,
    top: usize,
}

impl HackerNewsFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_base: HN_API_BASE.to_string(),
            top: DEFAULT_TOP_STORIES,
        }
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = top;
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_story(&self, id: u64) -> Result<Story> {
        self.client
            .get(format!("{}/item/{id}.json", self.api_base))
            .send()
            .await
            .context("hn item get()")?
            .error_for_status()
            .context("hn item non-2xx")?
            .json::<Story>()
            .await
            .context("hn item json")
    }
}

#[async_trait]
impl Fetcher for HackerNewsFetcher {
    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let ids: Vec<u64> = self
            .client
            .get(format!("{}/topstories.json", self.api_base))
            .send()
            .await
            .context("hn topstories get()")?
            .error_for_status()
            .context("hn topstories non-2xx")?
            .json()
            .await
            .context("hn topstories json")?;

        let stories = join_all(
            ids.into_iter()
                .take(self.top)
                .map(|id| self.fetch_story(id)),
        )
        .await;

        let mut out = Vec::new();
        for res in stories {
            match res {
                Ok(story) => out.extend(story_to_item(story)),
                Err(e) => tracing::debug!(error = ?e, "hn story skipped"),
            }
        }
        Ok(out)
    }

    fn source_name(&self) -> &str {
        SOURCE
    }
}
