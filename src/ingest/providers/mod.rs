pub mod hackernews;
pub mod rss;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::digest::DigestConfig;
use crate::ingest::types::Fetcher;

/// Shared HTTP client for every source; the timeout bounds each request.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("tech-news-digest/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}

/// Configured feeds in order, then Hacker News when enabled.
pub fn build_fetchers(cfg: &DigestConfig, client: &reqwest::Client) -> Vec<Box<dyn Fetcher>> {
    let mut out: Vec<Box<dyn Fetcher>> = cfg
        .feeds
        .iter()
        .map(|f| {
            Box::new(rss::RssFetcher::from_url(&f.name, &f.url, client.clone()).with_limit(f.limit))
                as Box<dyn Fetcher>
        })
        .collect();
    if cfg.hacker_news.enabled {
        out.push(Box::new(
            hackernews::HackerNewsFetcher::new(client.clone()).with_top(cfg.hacker_news.top_stories),
        ));
    }
    out
}
