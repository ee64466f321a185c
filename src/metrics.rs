//! Prometheus recorder plus a textfile dump for node_exporter's textfile collector.
use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::Path;

use crate::pipeline::RunReport;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Atomic write: tmp file then rename, so a scraper never sees half a file.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        write_textfile(&self.render(), path)
    }
}

pub fn write_textfile(rendered: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, rendered).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

fn describe() {
    describe_counter!("digest_runs_total", "Pipeline runs.");
    describe_counter!("digest_delivery_failures_total", "Runs whose digest was not delivered.");
    describe_gauge!("digest_fresh_items", "Items left after dedup in the last run.");
    describe_gauge!("digest_entries", "Entries in the last digest.");
    describe_gauge!("digest_history_evicted", "History entries evicted in the last run.");
    describe_gauge!("digest_failed_sources", "Sources whose fetch failed in the last run.");
    describe_counter!("rank_fallback_total", "Rankings that used original order.");
    describe_counter!("summarize_fallback_total", "Summaries that used the fallback.");
}

/// Per-run gauges and counters from the report.
pub fn record_run(report: &RunReport) {
    counter!("digest_runs_total").increment(1);
    if !report.delivered {
        counter!("digest_delivery_failures_total").increment(1);
    }
    gauge!("digest_fresh_items").set(report.fresh as f64);
    gauge!("digest_entries").set(report.ranked as f64);
    gauge!("digest_history_evicted").set(report.evicted as f64);
    gauge!("digest_failed_sources").set(report.failed_sources.len() as f64);
}
