//! Oracle adapter: provider abstraction over the LLM used for ranking and summaries.
//! An oracle takes a prompt and returns raw completion text; callers own parsing and fallbacks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ai::{AiConfig, AiProvider};
use crate::ingest::truncate_chars;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle is disabled")]
    Disabled,

    /// Connect/read failure or per-call timeout.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty completion")]
    EmptyCompletion,

    #[error("no well-formed JSON payload in response")]
    Malformed,

    #[error("payload does not match expected schema: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type OracleFuture<'a> = Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>>;

/// Trait object used by the ranking and summarization stages.
pub trait Oracle: Send + Sync {
    /// Send one user prompt and return the completion text.
    fn complete<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> OracleFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn Oracle>;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Factory: disabled config ⇒ `DisabledOracle`, otherwise the configured provider.
pub fn build_oracle(cfg: &AiConfig) -> anyhow::Result<DynOracle> {
    if !cfg.enabled {
        return Ok(Arc::new(DisabledOracle));
    }
    let http = reqwest::Client::builder()
        .user_agent(concat!("tech-news-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;

    let oracle: DynOracle = match cfg.provider()? {
        AiProvider::Anthropic => Arc::new(AnthropicOracle {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            base_url: base_url(cfg, ANTHROPIC_BASE_URL),
        }),
        AiProvider::OpenAi => Arc::new(OpenAiOracle {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: base_url(cfg, OPENAI_BASE_URL),
        }),
    };
    Ok(oracle)
}

fn base_url(cfg: &AiConfig, default: &str) -> String {
    cfg.base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, OracleError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(OracleError::Status {
        status: status.as_u16(),
        body: truncate_chars(&body, 300),
    })
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Anthropic Messages API.
pub struct AnthropicOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Oracle for AnthropicOracle {
    fn complete<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> OracleFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                max_tokens: u32,
                messages: Vec<Msg<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                content: Vec<Block>,
            }
            #[derive(Deserialize)]
            struct Block {
                #[serde(rename = "type")]
                kind: String,
                #[serde(default)]
                text: String,
            }

            let req = Req {
                model: &self.model,
                max_tokens,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
            };

            let resp = self
                .http
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&req)
                .send()
                .await?;
            let body: Resp = error_for_status(resp).await?.json().await?;

            let text: String = body
                .content
                .iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text.as_str())
                .collect();
            if text.trim().is_empty() {
                return Err(OracleError::EmptyCompletion);
            }
            Ok(text)
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

/// OpenAI Chat Completions API.
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Oracle for OpenAiOracle {
    fn complete<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> OracleFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                #[serde(default)]
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.3,
                max_tokens,
            };

            let resp = self
                .http
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await?;
            let body: Resp = error_for_status(resp).await?.json().await?;

            let text = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            if text.trim().is_empty() {
                return Err(OracleError::EmptyCompletion);
            }
            Ok(text)
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails with `Disabled`; every stage then takes its fallback.
pub struct DisabledOracle;

impl Oracle for DisabledOracle {
    fn complete<'a>(&'a self, _prompt: &'a str, _max_tokens: u32) -> OracleFuture<'a> {
        Box::pin(async { Err(OracleError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}
