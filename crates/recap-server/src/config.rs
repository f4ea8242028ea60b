use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use recap_api::Limits;
use recap_api::state::DEFAULT_MAX_TRANSCRIPT_CHARS;
use recap_llm::ProviderConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub limits: Limits,
    pub llm: ProviderConfig,
}

impl ServerConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("RECAP_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("RECAP_PORT '{}' is not a port", raw))?,
            None => 3000,
        };
        let max_transcript_chars = match get("RECAP_MAX_TRANSCRIPT_CHARS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("RECAP_MAX_TRANSCRIPT_CHARS '{}' is not a number", raw))?,
            None => DEFAULT_MAX_TRANSCRIPT_CHARS,
        };

        Ok(Self {
            host: get("RECAP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: PathBuf::from(get("RECAP_DB_PATH").unwrap_or_else(|| "recap.db".into())),
            limits: Limits { max_transcript_chars },
            llm: ProviderConfig::from_lookup(&lookup)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_llm::ProviderKind;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.addr().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.db_path, PathBuf::from("recap.db"));
        assert_eq!(cfg.limits.max_transcript_chars, DEFAULT_MAX_TRANSCRIPT_CHARS);
        assert_eq!(cfg.llm.kind, ProviderKind::Gemini);
    }

    #[test]
    fn overrides() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("RECAP_HOST", "127.0.0.1"),
            ("RECAP_PORT", "8088"),
            ("RECAP_DB_PATH", "/tmp/digests.db"),
            ("RECAP_MAX_TRANSCRIPT_CHARS", "5000"),
            ("RECAP_LLM_PROVIDER", "offline"),
        ]))
        .unwrap();
        assert_eq!(cfg.addr().unwrap().to_string(), "127.0.0.1:8088");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/digests.db"));
        assert_eq!(cfg.limits.max_transcript_chars, 5000);
        assert_eq!(cfg.llm.kind, ProviderKind::Offline);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(ServerConfig::from_lookup(lookup(&[("RECAP_PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("RECAP_PORT", "70000")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("RECAP_MAX_TRANSCRIPT_CHARS", "-1")])).is_err());
    }
}
