// src/analyze/summarize.rs
//! Per-item summary + one-line remark from the oracle, with a deterministic fallback.

use metrics::counter;
use serde::{Deserialize, Serialize};

use super::extract::extract_payload;
use super::oracle::{Oracle, OracleError};
use crate::ingest::truncate_chars;
use crate::ingest::types::NewsItem;

pub const SUMMARY_DESCRIPTION_CHARS: usize = 500;
pub const FALLBACK_SUMMARY_CHARS: usize = 200;
pub const PLACEHOLDER_SUMMARY: &str = "See the article for details.";
pub const PLACEHOLDER_COMMENT: &str = "Worth checking out!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub summary: String,
    pub comment: String,
    /// True when produced by `fallback_analysis`.
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
    comment: String,
}

pub fn summary_prompt(item: &NewsItem) -> String {
    format!(
        r#"Analyze the following news article:

Title: {}
URL: {}
Source: {}
Description: {}

Produce:
1. summary: 2-3 lines that concisely capture what the article says
2. comment: a one-line remark with a bit of humor (a light jab or a fun angle)

Return JSON:
{{"summary": "...", "comment": "..."}}
"#,
        item.title,
        item.url,
        item.source,
        truncate_chars(&item.description, SUMMARY_DESCRIPTION_CHARS)
    )
}

pub fn fallback_analysis(item: &NewsItem) -> Analysis {
    let summary = if item.description.trim().is_empty() {
        PLACEHOLDER_SUMMARY.to_string()
    } else {
        truncate_chars(item.description.trim(), FALLBACK_SUMMARY_CHARS)
    };
    Analysis {
        summary,
        comment: PLACEHOLDER_COMMENT.to_string(),
        fallback: true,
    }
}

async fn ask(
    item: &NewsItem,
    oracle: &dyn Oracle,
    max_tokens: u32,
) -> Result<Analysis, OracleError> {
    let reply = oracle.complete(&summary_prompt(item), max_tokens).await?;
    let p: SummaryPayload = extract_payload(&reply)?;
    let summary = p.summary.trim();
    let comment = p.comment.trim();
    if summary.is_empty() || comment.is_empty() {
        return Err(OracleError::Schema("empty summary or comment".into()));
    }
    Ok(Analysis {
        summary: summary.to_string(),
        comment: comment.to_string(),
        fallback: false,
    })
}

/// Never fails: any oracle or parse error yields `fallback_analysis(item)`.
pub async fn summarize(item: &NewsItem, oracle: &dyn Oracle, max_tokens: u32) -> Analysis {
    match ask(item, oracle, max_tokens).await {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(url = %item.url, error = %e, "summary failed; using fallback");
            counter!("summarize_fallback_total").increment(1);
            fallback_analysis(item)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn fallback_truncates_description() {
        let it = NewsItem::new("t", "https://a.test", Utc::now(), "S")
            .with_description("é".repeat(300));
        let a = fallback_analysis(&it);
        assert_eq!(a.summary.chars().count(), 200);
        assert_eq!(a.comment, PLACEHOLDER_COMMENT);
        assert!(a.fallback);
    }

    #[test]
    fn fallback_uses_placeholder_without_description() {
        let it = NewsItem::new("t", "https://a.test", Utc::now(), "S").with_description("   ");
        assert_eq!(fallback_analysis(&it).summary, PLACEHOLDER_SUMMARY);
    }

    #[test]
    fn prompt_caps_description() {
        let it = NewsItem::new("Big news", "https://a.test", Utc::now(), "S")
            .with_description("y".repeat(900));
        let p = summary_prompt(&it);
        assert!(p.contains("Title: Big news"));
        assert!(p.contains(&"y".repeat(500)));
        assert!(!p.contains(&"y".repeat(501)));
    }
}
