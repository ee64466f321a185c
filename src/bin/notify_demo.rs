//! Sends a sample digest (and the no-news variant) through the configured channels.
//! Defaults to stdout when `NOTIFY_CHANNELS` is unset, e.g. `NOTIFY_CHANNELS=slack,discord`.

use anyhow::{anyhow, Result};
use chrono::Utc;
use tech_news_digest::config::digest::{Channel, NotifyConfig};
use tech_news_digest::{Digest, DigestEntry, NewsItem, Notifier, NotifierMux};

fn parse_channels(raw: &str) -> Result<Vec<Channel>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
                .map_err(|_| anyhow!("unknown channel {s:?}"))
        })
        .collect()
}

fn sample() -> Vec<DigestEntry> {
    let now = Utc::now();
    vec![
        DigestEntry {
            news: NewsItem::new("Rust 1.90 released", "https://blog.rust-lang.org/", now, "Hacker News"),
            summary: "A new stable Rust is out with compiler and library improvements.".into(),
            comment: "The borrow checker sends its regards.".into(),
        },
        DigestEntry {
            news: NewsItem::new("Serverless pricing shake-up", "https://www.publickey1.jp/", now, "Publickey"),
            summary: "Cloud vendors revise pricing for function workloads.".into(),
            comment: "Cold starts, warm invoices.".into(),
        },
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let channels = match std::env::var("NOTIFY_CHANNELS") {
        Ok(raw) => parse_channels(&raw)?,
        Err(_) => vec![Channel::Stdout],
    };
    let mux = NotifierMux::from_config(&NotifyConfig { channels })?;

    let today = Utc::now().date_naive();
    mux.send_digest(&Digest::new(today, sample())).await?;
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    mux.send_digest(&Digest::no_news(today)).await?;

    println!("notify-demo done");
    Ok(())
}
