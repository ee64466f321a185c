// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const ENV_ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BEDROCK_BASE_URL";

fn default_timeout_secs() -> u64 {
    60
}
fn default_rank_max_tokens() -> u32 {
    1024
}
fn default_summary_max_tokens() -> u32 {
    512
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Anthropic,
    OpenAi,
}

impl AiProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn key_env_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "claude" | "anthropic" | "openai" (case-insensitive)
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from ANTHROPIC_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    /// Proxy / gateway override for the provider endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_rank_max_tokens")]
    pub rank_max_tokens: u32,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "claude".to_string(),
            model: None,
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            rank_max_tokens: default_rank_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();

        if cfg.enabled {
            let provider = cfg.provider()?;
            // Resolve api key if "ENV"
            if cfg.api_key.trim().eq_ignore_ascii_case("env") {
                let var = provider.key_env_var();
                cfg.api_key =
                    env::var(var).map_err(|_| anyhow::anyhow!("Missing {var} env var"))?;
            }
            if cfg.api_key.trim().is_empty() {
                anyhow::bail!("AI is enabled but no api_key is configured");
            }
        }

        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// ANTHROPIC_MODEL and ANTHROPIC_BEDROCK_BASE_URL win over the file for the
    /// Anthropic provider. Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if AiProvider::parse(&self.provider) != Some(AiProvider::Anthropic) {
            return;
        }
        if let Some(model) = non_empty_env(ENV_ANTHROPIC_MODEL) {
            self.model = Some(model);
        }
        if let Some(url) = non_empty_env(ENV_ANTHROPIC_BASE_URL) {
            tracing::info!(base_url = %url, "anthropic endpoint overridden");
            self.base_url = Some(url);
        }
    }

    /// 1) $AI_CONFIG_PATH (must exist)
    /// 2) config/ai.json
    /// 3) disabled default
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_AI_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        let p = PathBuf::from(DEFAULT_AI_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(&p);
        }
        tracing::warn!("no AI config found; ranking and summaries will use fallbacks");
        Ok(Self::default())
    }

    pub fn provider(&self) -> anyhow::Result<AiProvider> {
        AiProvider::parse(&self.provider)
            .ok_or_else(|| anyhow::anyhow!("Unsupported provider in config: {}", self.provider))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
