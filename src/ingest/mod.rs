// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{Fetcher, NewsItem};
use futures::future::join_all;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items fetched across all sources.");
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that failed to fetch or parse."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap: 1500 chars
    truncate_chars(&out, 1500)
}

/// Char-boundary safe prefix of at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Outcome of one fetch sweep. `failed` lists source names that produced an error.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<NewsItem>,
    pub failed: Vec<String>,
}

/// Fetch every source concurrently. A failing source contributes zero items;
/// results are concatenated in fetcher order.
pub async fn fetch_all(fetchers: &[Box<dyn Fetcher>]) -> FetchOutcome {
    ensure_metrics_described();

    let results = join_all(
        fetchers
            .iter()
            .map(|f| async move { (f.source_name(), f.fetch().await) }),
    )
    .await;

    let mut out = FetchOutcome::default();
    for (name, res) in results {
        match res {
            Ok(mut v) => {
                tracing::info!(source = name, items = v.len(), "fetched");
                counter!("ingest_items_total").increment(v.len() as u64);
                out.items.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = name, "source fetch failed");
                counter!("ingest_source_errors_total").increment(1);
                out.failed.push(name.to_string());
            }
        }
    }
    out
}
