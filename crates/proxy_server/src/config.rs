use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use upstream::{FetchMode, UnknownFetchMode};

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid QUINIELA_BIND '{0}'")]
    InvalidBind(String),

    #[error("invalid PORT '{0}'")]
    InvalidPort(String),

    #[error("invalid origin '{0}' in QUINIELA_ALLOWED_ORIGINS")]
    InvalidOrigin(String),

    #[error("QUINIELA_FETCH_MODE: {0}")]
    FetchMode(#[from] UnknownFetchMode),
}

/// Who may call us from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            return Ok(AllowedOrigins::Any);
        }
        if let Some(bad) = origins.iter().find(|o| HeaderValue::from_str(o).is_err()) {
            return Err(ConfigError::InvalidOrigin(bad.clone()));
        }
        Ok(AllowedOrigins::List(origins))
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub allowed_origins: AllowedOrigins,
    pub fetch_mode: FetchMode,
    pub event_log_dir: Option<PathBuf>,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with the variable source injected.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = match get("QUINIELA_BIND") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidBind(raw))?,
            None => {
                let port = match get("PORT") {
                    Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let allowed_origins = match get("QUINIELA_ALLOWED_ORIGINS") {
            Some(raw) => AllowedOrigins::parse(&raw)?,
            None => AllowedOrigins::Any,
        };

        let fetch_mode = match get("QUINIELA_FETCH_MODE") {
            Some(raw) => raw.parse()?,
            None => FetchMode::default(),
        };

        let event_log_dir = get("QUINIELA_EVENT_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self { bind, allowed_origins, fetch_mode, event_log_dir })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ProxyConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ProxyConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(cfg.allowed_origins, AllowedOrigins::Any);
        assert_eq!(cfg.fetch_mode, FetchMode::Http);
        assert!(cfg.event_log_dir.is_none());
    }

    #[test]
    fn port_only() {
        let cfg = config(&[("PORT", "8088")]).unwrap();
        assert_eq!(cfg.bind.port(), 8088);
    }

    #[test]
    fn bind_wins_over_port() {
        let cfg = config(&[("QUINIELA_BIND", "127.0.0.1:4000"), ("PORT", "8088")]).unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn origin_allowlist() {
        let cfg = config(&[("QUINIELA_ALLOWED_ORIGINS", "http://127.0.0.1:8080, http://localhost:8080")]).unwrap();
        assert_eq!(
            cfg.allowed_origins,
            AllowedOrigins::List(vec!["http://127.0.0.1:8080".into(), "http://localhost:8080".into()])
        );
    }

    #[test]
    fn star_in_list_means_any() {
        let cfg = config(&[("QUINIELA_ALLOWED_ORIGINS", "http://localhost:8080,*")]).unwrap();
        assert_eq!(cfg.allowed_origins, AllowedOrigins::Any);
    }

    #[test]
    fn fetch_mode_and_log_dir() {
        let cfg = config(&[("QUINIELA_FETCH_MODE", "fallback"), ("QUINIELA_EVENT_LOG_DIR", "logs")]).unwrap();
        assert_eq!(cfg.fetch_mode, FetchMode::Fallback);
        assert_eq!(cfg.event_log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(config(&[("PORT", "http")]), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(config(&[("QUINIELA_BIND", "localhost")]), Err(ConfigError::InvalidBind(_))));
        assert!(matches!(config(&[("QUINIELA_FETCH_MODE", "curl")]), Err(ConfigError::FetchMode(_))));
        assert!(matches!(
            config(&[("QUINIELA_ALLOWED_ORIGINS", "http://bad\norigin")]),
            Err(ConfigError::InvalidOrigin(_))
        ));
    }
}
