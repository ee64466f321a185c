//! One digest run: cleanup, fetch, dedup, rank, summarize and record, notify.
//!
//! Stages are linear. An empty dedup result skips ranking and summarization and
//! sends the no-news digest. Each summarized item is recorded in history before
//! the digest goes out, so a failed delivery never causes a re-summarize tomorrow.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::analyze::{rank, summarize, DynOracle, Oracle};
use crate::config::{AiConfig, DigestConfig};
use crate::dedup::filter_new;
use crate::history::HistoryStore;
use crate::ingest::{fetch_all, types::Fetcher};
use crate::notify::{Digest, DigestEntry, Notifier};

/// Stages in run order. `Summarized` and `Recorded` alternate per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// History cleanup done, nothing fetched yet.
    Started,
    Fetched,
    Deduped,
    Ranked,
    Summarized,
    /// The last summarized item is in history.
    Recorded,
    Notified,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_n: usize,
    pub retention_days: i64,
    pub summarize_concurrency: usize,
    pub rank_max_tokens: u32,
    pub summary_max_tokens: u32,
}

impl PipelineSettings {
    pub fn from_configs(digest: &DigestConfig, ai: &AiConfig) -> Self {
        Self {
            top_n: digest.top_n,
            retention_days: digest.retention_days,
            summarize_concurrency: digest.summarize_concurrency.max(1),
            rank_max_tokens: ai.rank_max_tokens,
            summary_max_tokens: ai.summary_max_tokens,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_configs(&DigestConfig::default(), &AiConfig::default())
    }
}

/// What happened in one run. `stage` is the last stage reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stage: Stage,
    pub evicted: usize,
    pub fetched: usize,
    pub failed_sources: Vec<String>,
    pub fresh: usize,
    pub ranked: usize,
    pub ranking_fallback: bool,
    pub summary_fallbacks: usize,
    pub no_news: bool,
    pub delivered: bool,
}

impl RunReport {
    fn new() -> Self {
        Self {
            stage: Stage::Started,
            evicted: 0,
            fetched: 0,
            failed_sources: Vec::new(),
            fresh: 0,
            ranked: 0,
            ranking_fallback: false,
            summary_fallbacks: 0,
            no_news: false,
            delivered: false,
        }
    }
}

pub struct Pipeline {
    fetchers: Vec<Box<dyn Fetcher>>,
    oracle: DynOracle,
    notifier: Box<dyn Notifier>,
    history: HistoryStore,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fetchers: Vec<Box<dyn Fetcher>>,
        oracle: DynOracle,
        notifier: Box<dyn Notifier>,
        history: HistoryStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetchers,
            oracle,
            notifier,
            history,
            settings,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Never fails: every stage has a fallback, and delivery errors are only logged.
    pub async fn run(&mut self, now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport::new();

        report.evicted = self.history.evict_older_than(self.settings.retention_days, now);
        if report.evicted > 0 {
            tracing::info!(
                evicted = report.evicted,
                remaining = self.history.len(),
                "history cleanup"
            );
        }

        let fetched = fetch_all(&self.fetchers).await;
        report.fetched = fetched.items.len();
        report.failed_sources = fetched.failed;
        report.stage = Stage::Fetched;

        let fresh = filter_new(fetched.items, &self.history);
        report.fresh = fresh.len();
        report.stage = Stage::Deduped;
        tracing::info!(
            stage = ?report.stage,
            fetched = report.fetched,
            fresh = report.fresh,
            "dedup done"
        );

        if fresh.is_empty() {
            report.no_news = true;
            report.delivered = self.deliver(&Digest::no_news(now.date_naive())).await;
            report.stage = Stage::Notified;
            return report;
        }

        let ranking = rank(
            &fresh,
            self.settings.top_n,
            self.oracle.as_ref(),
            self.settings.rank_max_tokens,
        )
        .await;
        report.ranked = ranking.items.len();
        report.ranking_fallback = ranking.fallback;
        report.stage = Stage::Ranked;
        tracing::info!(
            stage = ?report.stage,
            ranked = report.ranked,
            fallback = report.ranking_fallback,
            "ranking done"
        );

        let oracle: &dyn Oracle = &*self.oracle;
        let max_tokens = self.settings.summary_max_tokens;
        let mut pending = std::pin::pin!(stream::iter(ranking.items)
            .map(|item| async move {
                let analysis = summarize(&item, oracle, max_tokens).await;
                (item, analysis)
            })
            .buffered(self.settings.summarize_concurrency.max(1)));

        let mut entries = Vec::with_capacity(report.ranked);
        while let Some((news, analysis)) = pending.next().await {
            if analysis.fallback {
                report.summary_fallbacks += 1;
            }
            report.stage = Stage::Summarized;
            self.history.record(&news.url, now);
            report.stage = Stage::Recorded;
            entries.push(DigestEntry {
                news,
                summary: analysis.summary,
                comment: analysis.comment,
            });
        }
        tracing::info!(
            stage = ?report.stage,
            entries = entries.len(),
            summary_fallbacks = report.summary_fallbacks,
            history = self.history.len(),
            "summaries recorded"
        );

        report.delivered = self.deliver(&Digest::new(now.date_naive(), entries)).await;
        report.stage = Stage::Notified;
        report
    }

    async fn deliver(&self, digest: &Digest) -> bool {
        match self.notifier.send_digest(digest).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    notifier = self.notifier.name(),
                    error = ?e,
                    "digest not delivered"
                );
                false
            }
        }
    }
}
