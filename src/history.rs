//! history.rs — persisted record of which URLs were already notified, with age-based cleanup.
//!
//! File layout: `{"notified_urls": {"<url>": "<ISO-8601 instant>"}}`.
//! Missing or corrupt files load as empty. Every mutation is flushed synchronously;
//! a failed flush is logged and the in-memory map stays authoritative for the run.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    notified_urls: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    notified: HashMap<String, String>,
}

impl HistoryStore {
    /// Read the mapping from `path`. Never fails: absent or unreadable files yield an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let notified = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<HistoryFile>(&s) {
                Ok(f) => f.notified_urls.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "history file corrupt; starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "history file unreadable; starting empty");
                HashMap::new()
            }
        };
        tracing::debug!(path = %path.display(), entries = notified.len(), "history loaded");
        Self { path, notified }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.notified.contains_key(url)
    }

    /// When `url` was notified, if the stored stamp parses.
    pub fn notified_at(&self, url: &str) -> Option<DateTime<Utc>> {
        self.notified.get(url).and_then(|s| parse_timestamp(s))
    }

    /// Insert or overwrite `url -> now` and flush.
    pub fn record(&mut self, url: &str, now: DateTime<Utc>) {
        self.notified.insert(
            url.to_string(),
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        if let Err(e) = self.save() {
            tracing::warn!(path = %self.path.display(), url, error = %e, "history write failed");
        }
    }

    /// Drop entries strictly older than `now - retention_days`; an entry exactly on the
    /// cutoff is kept. Unparseable stamps are dropped too. Flushes once if anything was
    /// removed and returns the number removed. A window reaching past the earliest
    /// representable instant keeps every well-formed entry.
    pub fn evict_older_than(&mut self, retention_days: i64, now: DateTime<Utc>) -> usize {
        let cutoff = ChronoDuration::try_days(retention_days)
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let before = self.notified.len();
        let mut malformed = 0usize;

        self.notified.retain(|_, stamp| match parse_timestamp(stamp) {
            Some(ts) => ts >= cutoff,
            None => {
                malformed += 1;
                false
            }
        });

        let removed = before - self.notified.len();
        if removed > 0 {
            if let Err(e) = self.save() {
                tracing::warn!(path = %self.path.display(), error = %e, "history write failed");
            }
            tracing::info!(removed, malformed, "cleaned up old history entries");
        }
        removed
    }

    /// Write via temp file + rename so a crash never leaves a half-written file.
    fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = HistoryFile {
            notified_urls: self
                .notified
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

/// RFC 3339 first; naive ISO stamps (no offset) are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}
