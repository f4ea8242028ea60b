use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::gemini::{DEFAULT_GEMINI_MODEL, GeminiProvider};
use crate::offline::OfflineProvider;
use crate::openai::{DEEPSEEK_API_BASE, OPENAI_API_BASE, OpenAiCompatProvider, QWEN_API_BASE};
use crate::provider::LlmProvider;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown LLM provider '{0}' (expected gemini, deepseek, qwen, openai or offline)")]
    UnknownProvider(String),

    #[error("No API key for {provider}: set RECAP_LLM_API_KEY or {fallback_env}")]
    MissingApiKey {
        provider: &'static str,
        fallback_env: &'static str,
    },

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    DeepSeek,
    Qwen,
    OpenAi,
    Offline,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
            Self::OpenAi => "openai",
            Self::Offline => "offline",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::DeepSeek => "deepseek-chat",
            Self::Qwen => "qwen-plus",
            Self::OpenAi => "gpt-4o-mini",
            Self::Offline => "heuristic",
        }
    }

    /// Vendor-specific variable consulted when `RECAP_LLM_API_KEY` is unset.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Qwen => Some("DASHSCOPE_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Offline => None,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "deepseek" => Ok(Self::DeepSeek),
            "qwen" | "dashscope" => Ok(Self::Qwen),
            "openai" => Ok(Self::OpenAi),
            "offline" | "mock" => Ok(Self::Offline),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Read `RECAP_LLM_*` settings through `lookup`, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let kind = match get("RECAP_LLM_PROVIDER") {
            Some(name) => name.parse()?,
            None => ProviderKind::Gemini,
        };
        let api_key = get("RECAP_LLM_API_KEY").or_else(|| kind.api_key_env().and_then(get));
        let model = get("RECAP_LLM_MODEL").unwrap_or_else(|| kind.default_model().to_string());
        let timeout = match get("RECAP_LLM_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "RECAP_LLM_TIMEOUT_SECS".into(),
                value: raw.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            kind,
            api_key,
            model,
            base_url: get("RECAP_LLM_BASE_URL"),
            timeout: Duration::from_secs(timeout),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn require_key(&self) -> Result<String, ConfigError> {
        self.api_key.clone().ok_or(ConfigError::MissingApiKey {
            provider: self.kind.as_str(),
            fallback_env: self.kind.api_key_env().unwrap_or("RECAP_LLM_API_KEY"),
        })
    }
}

pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::Offline => Arc::new(OfflineProvider::default()),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            http_client()?,
            config.require_key()?,
            config.model.clone(),
            config.base_url.clone(),
            config.timeout,
        )),
        kind @ (ProviderKind::DeepSeek | ProviderKind::Qwen | ProviderKind::OpenAi) => {
            let default_base = match kind {
                ProviderKind::DeepSeek => DEEPSEEK_API_BASE,
                ProviderKind::Qwen => QWEN_API_BASE,
                _ => OPENAI_API_BASE,
            };
            Arc::new(OpenAiCompatProvider::new(
                http_client()?,
                kind.as_str(),
                config.require_key()?,
                config.model.clone(),
                config.base_url.clone().unwrap_or_else(|| default_base.to_string()),
                config.timeout,
            ))
        }
    };

    info!(provider = provider.name(), model = provider.model(), "LLM provider ready");
    Ok(provider)
}

fn http_client() -> Result<reqwest::Client, ConfigError> {
    // No overall timeout here: streams may legitimately run for minutes.
    // One-shot calls set a per-request timeout instead.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("recap/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_gemini_with_vendor_key() {
        let cfg = ProviderConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "g-key")])).unwrap();
        assert_eq!(cfg.kind, ProviderKind::Gemini);
        assert_eq!(cfg.api_key.as_deref(), Some("g-key"));
        assert_eq!(cfg.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn explicit_settings_win() {
        let cfg = ProviderConfig::from_lookup(lookup(&[
            ("RECAP_LLM_PROVIDER", "Qwen"),
            ("RECAP_LLM_API_KEY", "k"),
            ("DASHSCOPE_API_KEY", "ignored"),
            ("RECAP_LLM_MODEL", "qwen-max"),
            ("RECAP_LLM_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(cfg.kind, ProviderKind::Qwen);
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.model, "qwen-max");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_bad_values() {
        let err = ProviderConfig::from_lookup(lookup(&[("RECAP_LLM_PROVIDER", "claude")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(ref p) if p == "claude"));

        let err = ProviderConfig::from_lookup(lookup(&[("RECAP_LLM_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn remote_provider_needs_a_key() {
        let cfg = ProviderConfig::from_lookup(lookup(&[("RECAP_LLM_PROVIDER", "deepseek")])).unwrap();
        let err = build_provider(&cfg).err().expect("missing key must fail");
        assert!(matches!(err, ConfigError::MissingApiKey { provider: "deepseek", .. }));
    }

    #[test]
    fn offline_needs_nothing() {
        let cfg = ProviderConfig::from_lookup(lookup(&[("RECAP_LLM_PROVIDER", "offline")])).unwrap();
        let provider = build_provider(&cfg).unwrap();
        assert_eq!(provider.name(), "offline");
    }
}
