use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use tech_news_digest::analyze::oracle::{Oracle, OracleError, OracleFuture};
use tech_news_digest::analyze::summarize::PLACEHOLDER_COMMENT;
use tech_news_digest::{
    Digest, Fetcher, HistoryStore, NewsItem, Notifier, Pipeline, PipelineSettings, Stage,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 14, 8, 0, 0).unwrap()
}

fn item(i: usize) -> NewsItem {
    NewsItem::new(
        format!("Story {i}"),
        format!("https://news.test/{i}"),
        now() - Duration::hours(i as i64),
        "Hacker News",
    )
    .with_description(format!("Details about story {i}."))
}

struct Fixed(Vec<NewsItem>);
struct Broken;

#[async_trait::async_trait]
impl Fetcher for Fixed {
    async fn fetch(&self) -> anyhow::Result<Vec<NewsItem>> {
        Ok(self.0.clone())
    }
    fn source_name(&self) -> &str {
        "Fixed"
    }
}

#[async_trait::async_trait]
impl Fetcher for Broken {
    async fn fetch(&self) -> anyhow::Result<Vec<NewsItem>> {
        Err(anyhow!("dns failure"))
    }
    fn source_name(&self) -> &str {
        "Broken"
    }
}

/// Answers ranking prompts with a fixed reply and summary prompts per title.
struct Scripted {
    ranking: String,
    fail_titles: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(ranking: &str) -> Self {
        Self {
            ranking: ranking.to_string(),
            fail_titles: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing_for(mut self, title: &str) -> Self {
        self.fail_titles.push(title.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

impl Oracle for Scripted {
    fn complete<'a>(&'a self, prompt: &'a str, _max_tokens: u32) -> OracleFuture<'a> {
        self.prompts.lock().push(prompt.to_string());
        let reply = if prompt.contains("selected_indices") {
            Ok(self.ranking.clone())
        } else {
            let title = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Title: "))
                .unwrap_or_default()
                .to_string();
            if self.fail_titles.contains(&title) {
                Err(OracleError::Transport("timed out".into()))
            } else {
                Ok(format!(
                    r#"{{"summary": "summary of {title}", "comment": "remark on {title}"}}"#
                ))
            }
        };
        Box::pin(async move { reply })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Clone, Default)]
struct Recording {
    seen: Arc<Mutex<Vec<Digest>>>,
    fail: bool,
}

#[async_trait::async_trait]
impl Notifier for Recording {
    async fn send_digest(&self, digest: &Digest) -> anyhow::Result<()> {
        self.seen.lock().push(digest.clone());
        if self.fail {
            return Err(anyhow!("webhook returned 500"));
        }
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

fn settings(top_n: usize) -> PipelineSettings {
    PipelineSettings {
        top_n,
        retention_days: 30,
        summarize_concurrency: 3,
        ..PipelineSettings::default()
    }
}

fn pipeline(
    fetchers: Vec<Box<dyn Fetcher>>,
    oracle: Arc<Scripted>,
    notifier: Recording,
    history: HistoryStore,
    top_n: usize,
) -> Pipeline {
    Pipeline::new(fetchers, oracle, Box::new(notifier), history, settings(top_n))
}

#[tokio::test]
async fn eight_fetched_three_seen_ranked_four_zero_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let mut history = HistoryStore::load(&path);
    for i in [1, 3, 5] {
        history.record(&item(i).url, now() - Duration::days(1));
    }

    let oracle = Arc::new(Scripted::new(
        "```json\n{\"selected_indices\": [4, 0, 2]}\n```",
    ));
    let notifier = Recording::default();
    let fetched: Vec<_> = (0..8).map(item).collect();
    let mut p = pipeline(
        vec![Box::new(Fixed(fetched))],
        oracle.clone(),
        notifier.clone(),
        history,
        3,
    );

    let report = p.run(now()).await;
    assert_eq!(report.fetched, 8);
    assert_eq!(report.fresh, 5);
    assert_eq!(report.ranked, 3);
    assert!(!report.ranking_fallback);
    assert_eq!(report.summary_fallbacks, 0);
    assert_eq!(report.stage, Stage::Notified);
    assert!(report.delivered);

    // fresh = [0, 2, 4, 6, 7]; indices 4, 0, 2 pick stories 7, 0, 4
    let seen = notifier.seen.lock();
    assert_eq!(seen.len(), 1);
    let urls: Vec<_> = seen[0].entries.iter().map(|e| e.news.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://news.test/7", "https://news.test/0", "https://news.test/4"]
    );
    assert_eq!(seen[0].entries[0].summary, "summary of Story 7");
    assert_eq!(seen[0].entries[1].comment, "remark on Story 0");
    assert_eq!(seen[0].date, now().date_naive());

    // one ranking call plus one summary call per pick
    assert_eq!(oracle.calls(), 4);

    let reloaded = HistoryStore::load(&path);
    assert_eq!(reloaded.len(), 6);
    for i in [7, 0, 4, 1, 3, 5] {
        assert!(reloaded.contains(&item(i).url), "story {i} should be recorded");
    }
    assert!(!reloaded.contains(&item(2).url));
}

#[tokio::test]
async fn nothing_fresh_sends_one_no_news_digest_without_oracle_calls() {
    let dir = tempfile::tempdir().unwrap();
    let mut history = HistoryStore::load(dir.path().join("history.json"));
    for i in 0..3 {
        history.record(&item(i).url, now() - Duration::hours(2));
    }

    let oracle = Arc::new(Scripted::new(r#"{"selected_indices": [0]}"#));
    let notifier = Recording::default();
    let mut p = pipeline(
        vec![Box::new(Fixed((0..3).map(item).collect()))],
        oracle.clone(),
        notifier.clone(),
        history,
        5,
    );

    let report = p.run(now()).await;
    assert!(report.no_news);
    assert_eq!(report.ranked, 0);
    assert_eq!(oracle.calls(), 0);

    let seen = notifier.seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_empty());
}

#[tokio::test]
async fn failing_source_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(Scripted::new(r#"{"selected_indices": [1, 0]}"#));
    let notifier = Recording::default();
    let mut p = pipeline(
        vec![Box::new(Broken), Box::new(Fixed(vec![item(0), item(1)]))],
        oracle,
        notifier.clone(),
        HistoryStore::load(dir.path().join("history.json")),
        5,
    );

    let report = p.run(now()).await;
    assert_eq!(report.failed_sources, vec!["Broken".to_string()]);
    assert_eq!(report.fetched, 2);

    let seen = notifier.seen.lock();
    let titles: Vec<_> = seen[0].entries.iter().map(|e| e.news.title.as_str()).collect();
    assert_eq!(titles, vec!["Story 1", "Story 0"]);
}

#[tokio::test]
async fn items_are_recorded_even_when_delivery_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let oracle = Arc::new(Scripted::new(r#"{"selected_indices": [0, 1]}"#));
    let notifier = Recording {
        fail: true,
        ..Recording::default()
    };
    let fetchers = || -> Vec<Box<dyn Fetcher>> { vec![Box::new(Fixed(vec![item(0), item(1)]))] };

    let mut p = pipeline(fetchers(), oracle.clone(), notifier.clone(), HistoryStore::load(&path), 5);
    let report = p.run(now()).await;
    assert!(!report.delivered);
    assert_eq!(report.stage, Stage::Notified);
    assert!(p.history().contains(&item(0).url));
    assert!(p.history().contains(&item(1).url));

    // next day nothing is re-ranked or re-summarized
    let calls_before = oracle.calls();
    let mut next = pipeline(fetchers(), oracle.clone(), notifier.clone(), HistoryStore::load(&path), 5);
    let report = next.run(now() + Duration::days(1)).await;
    assert!(report.no_news);
    assert_eq!(oracle.calls(), calls_before);
    assert_eq!(notifier.seen.lock().len(), 2);
}

#[tokio::test]
async fn one_summary_failure_gets_fallback_only_for_that_item() {
    let dir = tempfile::tempdir().unwrap();
    let oracle =
        Arc::new(Scripted::new(r#"{"selected_indices": [0, 1, 2]}"#).failing_for("Story 1"));
    let notifier = Recording::default();
    let mut p = pipeline(
        vec![Box::new(Fixed((0..3).map(item).collect()))],
        oracle,
        notifier.clone(),
        HistoryStore::load(dir.path().join("history.json")),
        3,
    );

    let report = p.run(now()).await;
    assert_eq!(report.summary_fallbacks, 1);

    let seen = notifier.seen.lock();
    let e = &seen[0].entries;
    assert_eq!(e.len(), 3);
    assert_eq!(e[0].summary, "summary of Story 0");
    assert_eq!(e[1].summary, "Details about story 1.");
    assert_eq!(e[1].comment, PLACEHOLDER_COMMENT);
    assert_eq!(e[2].comment, "remark on Story 2");
    assert!(p.history().contains(&item(1).url));
}

#[tokio::test]
async fn stale_history_is_evicted_before_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let mut history = HistoryStore::load(dir.path().join("history.json"));
    history.record(&item(0).url, now() - Duration::days(45));

    let notifier = Recording::default();
    let mut p = pipeline(
        vec![Box::new(Fixed(vec![item(0)]))],
        Arc::new(Scripted::new("not json at all")),
        notifier.clone(),
        history,
        5,
    );

    let report = p.run(now()).await;
    assert_eq!(report.evicted, 1);
    assert_eq!(report.fresh, 1);
    assert!(report.ranking_fallback);
    assert_eq!(notifier.seen.lock()[0].entries[0].news.url, item(0).url);
    assert_eq!(p.history().notified_at(&item(0).url), Some(now()));
}
