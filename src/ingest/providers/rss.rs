// src/ingest/providers/rss.rs
//! Feed provider for RSS 2.0, RSS 1.0 (RDF) and Atom documents.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::normalize_text;
use crate::ingest::types::{Fetcher, NewsItem};

pub const DEFAULT_FEED_LIMIT: usize = 20;

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

/// Shared by RSS 2.0 and RDF; RDF carries `dc:date` instead of `pubDate`.
#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
    description: Option<String>,
}

// --- RSS 1.0 (RDF) ---

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: String,
}

impl AtomEntry {
    fn alternate_link(&self) -> Option<String> {
        self.link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

/// `<rss` is checked before `<feed` so RSS documents carrying `<feedburner:*>` stay RSS.
fn detect_format(xml: &str) -> FeedFormat {
    if xml.contains("<rdf:RDF") {
        FeedFormat::Rdf
    } else if xml.contains("<rss") {
        FeedFormat::Rss
    } else if xml.contains("<feed") {
        FeedFormat::Atom
    } else {
        FeedFormat::Rss
    }
}

/// RFC 2822 (RSS) first, then RFC 3339 (Atom, `dc:date`).
fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let dt = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    Utc.timestamp_opt(dt.unix_timestamp(), 0).single()
}

pub struct RssFetcher {
    name: String,
    limit: usize,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFetcher {
    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            limit: DEFAULT_FEED_LIMIT,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(
        name: impl Into<String>,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            limit: DEFAULT_FEED_LIMIT,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Parse a feed document. Entries without title or link are skipped;
    /// entries without a parseable date are stamped with `now`.
    pub fn parse_items_from_str(&self, s: &str, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let xml = scrub_html_entities_for_xml(s);

        let raw: Vec<RawEntry> = match detect_format(&xml) {
            FeedFormat::Rss => {
                let rss: Rss =
                    from_str(&xml).with_context(|| format!("parsing {} rss xml", self.name))?;
                rss.channel.item.into_iter().map(RawEntry::from).collect()
            }
            FeedFormat::Rdf => {
                let rdf: Rdf =
                    from_str(&xml).with_context(|| format!("parsing {} rdf xml", self.name))?;
                rdf.item.into_iter().map(RawEntry::from).collect()
            }
            FeedFormat::Atom => {
                let feed: AtomFeed =
                    from_str(&xml).with_context(|| format!("parsing {} atom xml", self.name))?;
                feed.entry.into_iter().map(RawEntry::from).collect()
            }
        };

        let mut out = Vec::with_capacity(raw.len().min(self.limit));
        for entry in raw.into_iter().take(self.limit) {
            let title = normalize_text(entry.title.as_deref().unwrap_or_default());
            let link = entry.link.unwrap_or_default().trim().to_string();
            if title.is_empty() || link.is_empty() {
                continue;
            }
            let published = entry.date.as_deref().and_then(parse_feed_date).unwrap_or(now);
            let description = normalize_text(entry.description.as_deref().unwrap_or_default());
            out.push(
                NewsItem::new(title, link, published, self.name.clone())
                    .with_description(description),
            );
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }
}

/// Format-independent view of one entry before normalization.
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    date: Option<String>,
    description: Option<String>,
}

impl From<RssItem> for RawEntry {
    fn from(it: RssItem) -> Self {
        Self {
            title: it.title,
            link: it.link,
            date: it.pub_date.or(it.dc_date),
            description: it.description,
        }
    }
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        let link = e.alternate_link();
        Self {
            title: e.title.map(|t| t.text),
            link,
            date: e.published.or(e.updated),
            description: e.summary.or(e.content).map(|t| t.text),
        }
    }
}

#[async_trait]
impl Fetcher for RssFetcher {
    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let now = Utc::now();
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s, now),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?
                    .error_for_status()
                    .with_context(|| format!("{} non-2xx", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_items_from_str(&body, now)
            }
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
