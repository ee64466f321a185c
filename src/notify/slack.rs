use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Digest, Notifier, FOOTER_TEXT, NO_NEWS_TEXT};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SLACK_WEBHOOK_URL").context("SLACK_WEBHOOK_URL missing")?;
        Ok(Self::new(url))
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

fn context_block(text: String) -> Value {
    json!({ "type": "context", "elements": [{ "type": "mrkdwn", "text": text }] })
}

/// Block Kit payload: header, date, one section per entry, footer.
pub fn render_blocks(digest: &Digest) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": "📰 Tech News Digest", "emoji": true }
        }),
        context_block(format!("📅 {}", digest.date.format("%Y-%m-%d"))),
        json!({ "type": "divider" }),
    ];

    if digest.is_empty() {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("ℹ️ {NO_NEWS_TEXT}") }
        }));
    }

    for (i, e) in digest.entries.iter().enumerate() {
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*{}. <{}|{}>*\n{} {}\n\n{}",
                    i + 1,
                    e.news.url,
                    e.news.title,
                    super::source_emoji(&e.news.source),
                    e.news.source,
                    e.summary
                )
            }
        }));
        blocks.push(context_block(format!("💬 {}", e.comment)));
        if i + 1 < digest.entries.len() {
            blocks.push(json!({ "type": "divider" }));
        }
    }

    blocks.push(json!({ "type": "divider" }));
    blocks.push(context_block(format!("🤖 {FOOTER_TEXT}")));

    json!({ "text": digest.title(), "blocks": blocks })
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send_digest(&self, digest: &Digest) -> Result<()> {
        let body = render_blocks(digest);
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
