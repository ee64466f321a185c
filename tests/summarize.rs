use chrono::Utc;

use tech_news_digest::analyze::oracle::{Oracle, OracleError, OracleFuture};
use tech_news_digest::analyze::summarize::{PLACEHOLDER_COMMENT, PLACEHOLDER_SUMMARY};
use tech_news_digest::analyze::summarize;
use tech_news_digest::NewsItem;

/// Fails for one title; returns `reply` otherwise.
struct PerTitle {
    fail_title: &'static str,
    reply: &'static str,
}

impl Oracle for PerTitle {
    fn complete<'a>(&'a self, prompt: &'a str, _max_tokens: u32) -> OracleFuture<'a> {
        let fail = prompt.contains(&format!("Title: {}\n", self.fail_title));
        Box::pin(async move {
            if fail {
                Err(OracleError::Status {
                    status: 529,
                    body: "overloaded".into(),
                })
            } else {
                Ok(self.reply.to_string())
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        "per-title"
    }
}

fn item(title: &str, description: &str) -> NewsItem {
    NewsItem::new(title, format!("https://s.test/{title}"), Utc::now(), "Publickey")
        .with_description(description)
}

#[tokio::test]
async fn only_the_failing_item_falls_back() {
    let o = PerTitle {
        fail_title: "second",
        reply: r#"{"summary": "A crisp summary.", "comment": "Ha."}"#,
    };
    let batch = [
        item("first", "one"),
        item("second", "the second description"),
        item("third", "three"),
    ];

    let mut out = Vec::new();
    for it in &batch {
        out.push(summarize(it, &o, 256).await);
    }

    assert!(!out[0].fallback);
    assert_eq!(out[0].summary, "A crisp summary.");
    assert!(out[1].fallback);
    assert_eq!(out[1].summary, "the second description");
    assert_eq!(out[1].comment, PLACEHOLDER_COMMENT);
    assert!(!out[2].fallback);
    assert_eq!(out[2].comment, "Ha.");
}

#[tokio::test]
async fn empty_fields_or_missing_keys_fall_back() {
    for reply in [
        r#"{"summary": "   ", "comment": "x"}"#,
        r#"{"summary": "s"}"#,
        r#"{"summary": 3, "comment": "x"}"#,
    ] {
        let o = PerTitle { fail_title: "-", reply };
        let a = summarize(&item("t", ""), &o, 256).await;
        assert!(a.fallback, "reply {reply:?} should fall back");
        assert_eq!(a.summary, PLACEHOLDER_SUMMARY);
    }
}

#[tokio::test]
async fn fenced_summary_is_trimmed() {
    let o = PerTitle {
        fail_title: "-",
        reply: "```json\n{\"summary\": \"  Tidy.  \", \"comment\": \" Nice. \"}\n```",
    };
    let a = summarize(&item("t", "d"), &o, 256).await;
    assert!(!a.fallback);
    assert_eq!(a.summary, "Tidy.");
    assert_eq!(a.comment, "Nice.");
}
