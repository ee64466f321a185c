// src/notify/mod.rs
pub mod discord;
pub mod email;
pub mod github;
pub mod slack;
pub mod stdout;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::digest::{Channel, NotifyConfig};
use crate::ingest::types::NewsItem;

pub const NO_NEWS_TEXT: &str = "No new tech news today.";
pub const FOOTER_TEXT: &str = "Powered by Claude AI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub news: NewsItem,
    pub summary: String,
    pub comment: String,
}

/// One run's payload. Empty `entries` is the "no news" variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub date: NaiveDate,
    pub entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn new(date: NaiveDate, entries: Vec<DigestEntry>) -> Self {
        Self { date, entries }
    }

    pub fn no_news(date: NaiveDate) -> Self {
        Self::new(date, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn title(&self) -> String {
        if self.is_empty() {
            format!("Today's Tech News - {}", self.date.format("%Y-%m-%d"))
        } else {
            format!("Tech News Digest - {}", self.date.format("%Y-%m-%d"))
        }
    }
}

/// Emoji per known source, generic link otherwise.
pub fn source_emoji(source: &str) -> &'static str {
    match source {
        "TechCrunch" => "🚀",
        "Hacker News" => "📙",
        "ITmedia" => "🇯🇵",
        "ZDNet Japan" => "📰",
        "日経xTECH" => "📈",
        "Publickey" => "🔑",
        _ => "🔗",
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_digest(&self, digest: &Digest) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans a digest out to every configured channel. Channel failures are logged;
/// the mux errors only when no channel delivered.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Build the channels named in config; missing credentials are an error.
    pub fn from_config(cfg: &NotifyConfig) -> Result<Self> {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::with_capacity(cfg.channels.len());
        for ch in &cfg.channels {
            let n: Box<dyn Notifier> = match ch {
                Channel::Github => Box::new(github::GitHubNotifier::from_env()?),
                Channel::Slack => Box::new(slack::SlackNotifier::from_env()?),
                Channel::Discord => Box::new(discord::DiscordNotifier::from_env()?),
                Channel::Email => Box::new(email::EmailNotifier::from_env()?),
                Channel::Stdout => Box::new(stdout::StdoutNotifier),
            };
            channels.push(n);
        }
        if channels.is_empty() {
            return Err(anyhow!("no notification channel configured"));
        }
        Ok(Self::new(channels))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    async fn send_digest(&self, digest: &Digest) -> Result<()> {
        let mut delivered = 0usize;
        for ch in &self.channels {
            match ch.send_digest(digest).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::info!(channel = ch.name(), entries = digest.entries.len(), "digest delivered");
                }
                Err(e) => {
                    tracing::warn!(channel = ch.name(), error = ?e, "digest delivery failed");
                }
            }
        }
        if delivered == 0 && !self.channels.is_empty() {
            return Err(anyhow!("digest delivery failed on every channel"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recording(Arc<Mutex<usize>>);
    struct Failing;

    #[async_trait::async_trait]
    impl Notifier for Recording {
        async fn send_digest(&self, _digest: &Digest) -> Result<()> {
            *self.0.lock() += 1;
            Ok(())
        }
        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[async_trait::async_trait]
    impl Notifier for Failing {
        async fn send_digest(&self, _digest: &Digest) -> Result<()> {
            Err(anyhow!("503"))
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 14).unwrap()
    }

    #[tokio::test]
    async fn one_failing_channel_does_not_block_the_rest() {
        let hits = Arc::new(Mutex::new(0));
        let mux = NotifierMux::new(vec![Box::new(Failing), Box::new(Recording(hits.clone()))]);
        mux.send_digest(&Digest::no_news(day())).await.unwrap();
        assert_eq!(*hits.lock(), 1);
    }

    #[tokio::test]
    async fn all_failing_is_an_error() {
        let mux = NotifierMux::new(vec![Box::new(Failing), Box::new(Failing)]);
        assert!(mux.send_digest(&Digest::no_news(day())).await.is_err());
    }

    #[test]
    fn titles_distinguish_no_news() {
        assert_eq!(Digest::no_news(day()).title(), "Today's Tech News - 2025-10-14");
        assert_eq!(source_emoji("Publickey"), "🔑");
        assert_eq!(source_emoji("Somewhere"), "🔗");
    }
}
