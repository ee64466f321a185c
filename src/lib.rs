// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod dedup;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::history::HistoryStore;
pub use crate::ingest::types::{Fetcher, NewsItem};
pub use crate::notify::{Digest, DigestEntry, Notifier, NotifierMux};
pub use crate::pipeline::{Pipeline, PipelineSettings, RunReport, Stage};
