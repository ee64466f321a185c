// src/analyze/rank.rs
//! Ranking: ask the oracle for the most notable candidates, by index, in importance order.
//!
//! - Returned indices outside `[0, len)` are dropped; repeated indices keep their first
//!   occurrence only; the survivors are truncated to `top_n`.
//! - Any oracle failure, unparseable reply, or a reply with no usable index falls back to
//!   the first `top_n` candidates in their original order.

use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use super::extract::extract_payload;
use super::oracle::{Oracle, OracleError};
use crate::ingest::truncate_chars;
use crate::ingest::types::NewsItem;

pub const RANK_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct RankingPayload {
    /// Checked per element so one bad entry cannot sink the rest.
    selected_indices: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub items: Vec<NewsItem>,
    /// True when `items` is the original-order fallback.
    pub fallback: bool,
}

/// One block per candidate, tagged with its index, in input order.
pub fn render_candidates(items: &[NewsItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(idx, it)| {
            let mut desc = truncate_chars(&it.description, RANK_DESCRIPTION_CHARS);
            if desc.len() < it.description.len() {
                desc.push_str("...");
            }
            format!(
                "[{idx}] Title: {}\n    Source: {}\n    URL: {}\n    Published: {}\n    Description: {}\n",
                it.title,
                it.source,
                it.url,
                it.published.format("%Y-%m-%d %H:%M"),
                desc
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn ranking_prompt(items: &[NewsItem], top_n: usize) -> String {
    format!(
        r#"Below is the list of technology news collected today.
Pick the {top_n} articles that software developers would find the most newsworthy and important.

Selection criteria:
- Is it drawing attention as a technology trend?
- Does it affect how software is built?
- Is it likely to be widely discussed in the industry?
- Is it novel or innovative?

{list}
Return the indices of the chosen articles as JSON, most important first.
Format: {{"selected_indices": [1, 5, 12]}}
"#,
        list = render_candidates(items)
    )
}

/// Bounds-check, keep first occurrences, truncate. Anything that is not a
/// non-negative integer below `len` counts as out of range.
pub fn select_indices(indices: &[Value], len: usize, top_n: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    indices
        .iter()
        .filter_map(|v| v.as_u64().and_then(|i| usize::try_from(i).ok()))
        .filter(|&i| i < len)
        .filter(|&i| seen.insert(i))
        .take(top_n)
        .collect()
}

fn fallback(items: &[NewsItem], top_n: usize, reason: &OracleError) -> Ranking {
    tracing::warn!(error = %reason, top_n, "ranking failed; using original order");
    counter!("rank_fallback_total").increment(1);
    Ranking {
        items: items.iter().take(top_n).cloned().collect(),
        fallback: true,
    }
}

pub async fn rank(
    items: &[NewsItem],
    top_n: usize,
    oracle: &dyn Oracle,
    max_tokens: u32,
) -> Ranking {
    if items.is_empty() || top_n == 0 {
        return Ranking {
            items: Vec::new(),
            fallback: false,
        };
    }

    let prompt = ranking_prompt(items, top_n);
    let reply = match oracle.complete(&prompt, max_tokens).await {
        Ok(r) => r,
        Err(e) => return fallback(items, top_n, &e),
    };
    let payload: RankingPayload = match extract_payload(&reply) {
        Ok(p) => p,
        Err(e) => return fallback(items, top_n, &e),
    };

    let picked = select_indices(&payload.selected_indices, items.len(), top_n);
    if picked.is_empty() {
        return fallback(
            items,
            top_n,
            &OracleError::Schema("no in-range index in selected_indices".into()),
        );
    }
    let dropped = payload.selected_indices.len() - picked.len();
    if dropped > 0 {
        tracing::debug!(dropped, "ignored out-of-range, duplicate, or surplus indices");
    }

    tracing::info!(provider = oracle.provider_name(), selected = ?picked, "ranked");
    Ranking {
        items: picked.into_iter().map(|i| items[i].clone()).collect(),
        fallback: false,
    }
}
