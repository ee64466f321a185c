use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{source_emoji, Digest, Notifier, FOOTER_TEXT, NO_NEWS_TEXT};

/// Discord rejects more than this many embeds per message.
pub const MAX_EMBEDS: usize = 10;
const EMBED_COLOR: u32 = 0x5865F2;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DISCORD_WEBHOOK_URL").context("DISCORD_WEBHOOK_URL missing")?;
        Ok(Self::new(url))
    }

    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Debug, Serialize)]
pub struct DiscordEmbed {
    title: String,
    url: String,
    description: String,
    color: u32,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
pub struct DiscordWebhookPayload {
    pub content: String,
    pub embeds: Vec<DiscordEmbed>,
}

pub fn render_payload(digest: &Digest) -> DiscordWebhookPayload {
    if digest.is_empty() {
        return DiscordWebhookPayload {
            content: format!("📰 **{}**\nℹ️ {NO_NEWS_TEXT}", digest.title()),
            embeds: Vec::new(),
        };
    }
    let embeds = digest
        .entries
        .iter()
        .take(MAX_EMBEDS)
        .map(|e| DiscordEmbed {
            title: e.news.title.clone(),
            url: e.news.url.clone(),
            description: format!("{}\n\n💬 *{}*", e.summary, e.comment),
            color: EMBED_COLOR,
            footer: EmbedFooter {
                text: format!("{} {} · {FOOTER_TEXT}", source_emoji(&e.news.source), e.news.source),
            },
        })
        .collect();
    DiscordWebhookPayload {
        content: format!("📰 **{}**", digest.title()),
        embeds,
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send_digest(&self, digest: &Digest) -> Result<()> {
        let payload = render_payload(digest);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "discord post failed; retrying");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::NewsItem;
    use crate::notify::DigestEntry;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn caps_embeds_at_ten() {
        let entries = (0..12)
            .map(|i| DigestEntry {
                news: NewsItem::new(format!("T{i}"), format!("https://a.test/{i}"), Utc::now(), "TechCrunch"),
                summary: "s".into(),
                comment: "c".into(),
            })
            .collect();
        let p = render_payload(&Digest::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), entries));
        assert_eq!(p.embeds.len(), MAX_EMBEDS);
        assert_eq!(p.embeds[0].title, "T0");
        assert!(p.embeds[0].footer.text.starts_with("🚀 TechCrunch"));
    }

    #[test]
    fn no_news_payload_has_no_embeds() {
        let p = render_payload(&Digest::no_news(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()));
        assert!(p.embeds.is_empty());
        assert!(p.content.contains(NO_NEWS_TEXT));
    }
}
