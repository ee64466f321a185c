//! Daily digest as a GitHub issue.
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{source_emoji, Digest, Notifier, FOOTER_TEXT, NO_NEWS_TEXT};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("tech-news-digest/", env!("CARGO_PKG_VERSION"));

pub struct GitHubNotifier {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    api_base: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    html_url: Option<String>,
}

/// `owner/repo` with both halves non-empty.
pub fn parse_repository(s: &str) -> Result<(String, String)> {
    let (owner, repo) = s
        .trim()
        .split_once('/')
        .ok_or_else(|| anyhow!("GITHUB_REPOSITORY must be owner/repo, got {s:?}"))?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(anyhow!("GITHUB_REPOSITORY must be owner/repo, got {s:?}"));
    }
    Ok((owner.to_string(), repo.to_string()))
}

pub fn labels(digest: &Digest) -> Vec<&'static str> {
    let mut l = vec!["daily-news", "automated"];
    if digest.is_empty() {
        l.push("no-news");
    }
    l
}

pub fn issue_body(digest: &Digest) -> String {
    let date = digest.date.format("%Y-%m-%d");
    let mut lines: Vec<String> = Vec::new();

    if digest.is_empty() {
        lines.push("# ℹ️ Today's Tech News".into());
        lines.push(String::new());
        lines.push(format!("**Date:** {date}"));
        lines.push(String::new());
        lines.push(NO_NEWS_TEXT.into());
        lines.push(String::new());
    } else {
        lines.push("# 📰 Tech News Digest".into());
        lines.push(String::new());
        lines.push(format!("**Date:** {date}  "));
        lines.push(format!("**Items:** {}", digest.entries.len()));
        lines.push(String::new());
        lines.push("---".into());
        lines.push(String::new());

        let n = digest.entries.len();
        for (idx, e) in digest.entries.iter().enumerate() {
            lines.push(format!("## {}. {}", idx + 1, e.news.title));
            lines.push(String::new());
            lines.push(format!("{} **Source:** {}  ", source_emoji(&e.news.source), e.news.source));
            lines.push(format!("🔗 **Link:** {}", e.news.url));
            lines.push(String::new());
            lines.push("### 📝 Summary".into());
            lines.push(e.summary.clone());
            lines.push(String::new());
            if !e.comment.is_empty() {
                lines.push("### 💬 Comment".into());
                lines.push(format!("> {}", e.comment));
                lines.push(String::new());
            }
            if idx + 1 < n {
                lines.push("---".into());
                lines.push(String::new());
            }
        }
    }

    lines.push("---".into());
    lines.push(String::new());
    lines.push(format!("🤖 *{FOOTER_TEXT}*"));
    lines.join("\n")
}

pub fn issue_request(digest: &Digest) -> IssueRequest {
    IssueRequest {
        title: digest.title(),
        body: issue_body(digest),
        labels: labels(digest),
    }
}

impl GitHubNotifier {
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN missing")?;
        let repository = std::env::var("GITHUB_REPOSITORY").context("GITHUB_REPOSITORY missing")?;
        let (owner, repo) = parse_repository(&repository)?;
        Self::new(token, owner, repo)
    }

    pub fn new(token: String, owner: String, repo: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building GitHub client")?;
        Ok(Self {
            client,
            token,
            owner,
            repo,
            api_base: GITHUB_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, self.owner, self.repo)
    }
}

#[async_trait::async_trait]
impl Notifier for GitHubNotifier {
    async fn send_digest(&self, digest: &Digest) -> Result<()> {
        let rsp = self
            .client
            .post(self.issues_url())
            .timeout(self.timeout)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .json(&issue_request(digest))
            .send()
            .await
            .context("github issue post")?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("github issue create failed: {status}: {body}"));
        }
        let created: IssueResponse = rsp.json().await.context("github issue response")?;
        tracing::info!(
            url = created.html_url.as_deref().unwrap_or("-"),
            entries = digest.entries.len(),
            "github issue created"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "github"
    }
}
