//! Daily tech-news digest: one pipeline run per invocation.
//!
//! Configuration errors exit non-zero before the pipeline starts; everything
//! after that degrades through fallbacks and is reported in the logs.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tech_news_digest::analyze::build_oracle;
use tech_news_digest::config::{AiConfig, DigestConfig};
use tech_news_digest::ingest::providers::{build_fetchers, http_client};
use tech_news_digest::metrics::{record_run, Metrics};
use tech_news_digest::{HistoryStore, NotifierMux, Pipeline, PipelineSettings};

/// `RUST_LOG` wins; otherwise info for this crate and warn for dependencies.
/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tech_news_digest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_pipeline(digest: &DigestConfig, ai: &AiConfig) -> Result<Pipeline> {
    let notifier = NotifierMux::from_config(&digest.notify).context("notification channels")?;
    let oracle = build_oracle(ai).context("ai oracle")?;
    let client = http_client(digest.fetch_timeout_secs)?;
    let fetchers = build_fetchers(digest, &client);
    let history = HistoryStore::load(digest.history_path.clone());

    tracing::info!(
        sources = fetchers.len(),
        channels = notifier.len(),
        oracle = oracle.provider_name(),
        history = history.len(),
        history_path = %history.path().display(),
        top_n = digest.top_n,
        "pipeline ready"
    );

    Ok(Pipeline::new(
        fetchers,
        oracle,
        Box::new(notifier),
        history,
        PipelineSettings::from_configs(digest, ai),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let digest = match DigestConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = ?e, "digest config");
            return ExitCode::FAILURE;
        }
    };
    let ai = match AiConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = ?e, "ai config");
            return ExitCode::FAILURE;
        }
    };

    let metrics = match &digest.metrics_textfile {
        Some(_) => match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = ?e, "metrics disabled");
                None
            }
        },
        None => None,
    };

    let mut pipeline = match build_pipeline(&digest, &ai) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = ?e, "configuration error");
            return ExitCode::FAILURE;
        }
    };

    let report = pipeline.run(Utc::now()).await;
    record_run(&report);
    tracing::info!(
        stage = ?report.stage,
        fetched = report.fetched,
        fresh = report.fresh,
        ranked = report.ranked,
        ranking_fallback = report.ranking_fallback,
        summary_fallbacks = report.summary_fallbacks,
        failed_sources = ?report.failed_sources,
        delivered = report.delivered,
        "run finished"
    );

    if let (Some(m), Some(path)) = (&metrics, &digest.metrics_textfile) {
        if let Err(e) = m.write_textfile(path) {
            tracing::warn!(error = ?e, path = %path.display(), "metrics textfile not written");
        }
    }

    ExitCode::SUCCESS
}
