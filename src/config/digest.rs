// src/config/digest.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DIGEST_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_DIGEST_CONFIG_PATH: &str = "config/digest.toml";
pub const DEFAULT_HISTORY_PATH: &str = "data/history.json";
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const MAX_RETENTION_DAYS: i64 = 3650;
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_feed_limit() -> usize {
    crate::ingest::providers::rss::DEFAULT_FEED_LIMIT
}

impl FeedSource {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            limit: default_feed_limit(),
        }
    }
}

pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new("TechCrunch", "https://techcrunch.com/feed/"),
        FeedSource::new(
            "ITmedia",
            "https://rss.itmedia.co.jp/rss/2.0/itmedia_all.xml",
        ),
        FeedSource::new(
            "ZDNet Japan",
            "https://feeds.japan.zdnet.com/rss/zdnet/all.rdf",
        ),
        FeedSource::new("日経xTECH", "https://xtech.nikkei.com/rss/index.rdf"),
        FeedSource::new("Publickey", "https://www.publickey1.jp/atom.xml"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub enabled: bool,
    pub top_stories: usize,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_stories: crate::ingest::providers::hackernews::DEFAULT_TOP_STORIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Github,
    Slack,
    Discord,
    Email,
    Stdout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub channels: Vec<Channel>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channels: vec![Channel::Github],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub history_path: PathBuf,
    pub retention_days: i64,
    pub top_n: usize,
    pub summarize_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub feeds: Vec<FeedSource>,
    pub hacker_news: HackerNewsConfig,
    pub notify: NotifyConfig,
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            retention_days: DEFAULT_RETENTION_DAYS,
            top_n: DEFAULT_TOP_N,
            summarize_concurrency: 1,
            fetch_timeout_secs: 10,
            feeds: default_feeds(),
            hacker_news: HackerNewsConfig::default(),
            notify: NotifyConfig::default(),
            metrics_textfile: None,
        }
    }
}

impl DigestConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let cfg: DigestConfig = toml::from_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// 1) $DIGEST_CONFIG_PATH (must exist)
    /// 2) config/digest.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied on top in every case.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_DIGEST_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_DIGEST_CONFIG_PATH} points to non-existent path"
                ));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_DIGEST_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(p) = std::env::var("DIGEST_HISTORY_PATH") {
            self.history_path = PathBuf::from(p);
        }
        if let Ok(v) = std::env::var("DIGEST_RETENTION_DAYS") {
            self.retention_days = v
                .trim()
                .parse()
                .with_context(|| format!("DIGEST_RETENTION_DAYS is not an integer: {v}"))?;
        }
        if let Ok(v) = std::env::var("DIGEST_TOP_N") {
            self.top_n = v
                .trim()
                .parse()
                .with_context(|| format!("DIGEST_TOP_N is not an integer: {v}"))?;
        }
        if let Ok(p) = std::env::var("DIGEST_METRICS_TEXTFILE") {
            self.metrics_textfile = Some(PathBuf::from(p));
        }
        Ok(self.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.retention_days <= 0 {
            tracing::warn!(
                retention_days = self.retention_days,
                "retention_days must be positive; using default"
            );
            self.retention_days = DEFAULT_RETENTION_DAYS;
        } else if self.retention_days > MAX_RETENTION_DAYS {
            tracing::warn!(
                retention_days = self.retention_days,
                max = MAX_RETENTION_DAYS,
                "retention_days too large; capping"
            );
            self.retention_days = MAX_RETENTION_DAYS;
        }
        if self.top_n == 0 {
            self.top_n = DEFAULT_TOP_N;
        }
        self.summarize_concurrency = self.summarize_concurrency.max(1);
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = 10;
        }
        self.feeds
            .retain(|f| !f.name.trim().is_empty() && !f.url.trim().is_empty());
        let mut seen = Vec::with_capacity(self.notify.channels.len());
        self.notify.channels.retain(|c| {
            let fresh = !seen.contains(c);
            seen.push(*c);
            fresh
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: DigestConfig = toml::from_str(
            r#"
top_n = 3

[notify]
channels = ["slack", "stdout"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.top_n, 3);
        assert_eq!(cfg.retention_days, 30);
        assert_eq!(cfg.history_path, PathBuf::from("data/history.json"));
        assert_eq!(cfg.feeds.len(), 5);
        assert!(cfg.hacker_news.enabled);
        assert_eq!(cfg.notify.channels, vec![Channel::Slack, Channel::Stdout]);
    }

    #[test]
    fn explicit_feeds_replace_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("digest.toml");
        fs::write(
            &p,
            r#"
retention_days = -4
summarize_concurrency = 0

[[feeds]]
name = "Lobsters"
url = "https://lobste.rs/rss"
limit = 10

[[feeds]]
name = ""
url = "https://nameless.test/rss"
"#,
        )
        .unwrap();
        let cfg = DigestConfig::load_from(&p).unwrap();
        assert_eq!(cfg.feeds.len(), 1);
        assert_eq!(cfg.feeds[0].limit, 10);
        assert_eq!(cfg.retention_days, DEFAULT_RETENTION_DAYS);
        assert_eq!(cfg.summarize_concurrency, 1);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_win() {
        env::set_var("DIGEST_TOP_N", "7");
        env::set_var("DIGEST_HISTORY_PATH", "/tmp/h.json");
        let cfg = DigestConfig::default().with_env_overrides().unwrap();
        assert_eq!(cfg.top_n, 7);
        assert_eq!(cfg.history_path, PathBuf::from("/tmp/h.json"));

        env::set_var("DIGEST_RETENTION_DAYS", "200000000");
        let cfg = DigestConfig::default().with_env_overrides().unwrap();
        assert_eq!(cfg.retention_days, MAX_RETENTION_DAYS);
        env::remove_var("DIGEST_RETENTION_DAYS");

        env::set_var("DIGEST_TOP_N", "lots");
        assert!(DigestConfig::default().with_env_overrides().is_err());

        env::remove_var("DIGEST_TOP_N");
        env::remove_var("DIGEST_HISTORY_PATH");
    }
}
