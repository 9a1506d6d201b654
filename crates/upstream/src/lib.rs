//! Quiniela proxy — upstream fetch strategies
//!
//! loteriasyapuestas.es blocks anything that does not look like its own game
//! portal. Two ways to get through:
//! - `HttpFetcher`: plain GET with the disguise headers (cheap, usually enough)
//! - `BrowserFetcher`: headless Chrome with the same headers (slow, for hosts
//!   where the HTTP path gets 403 no matter what)
//!
//! `FallbackFetcher` chains them, `build_fetcher` picks one per deployment.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod browser;
pub mod error;
pub mod fallback;
pub mod headers;
pub mod http;

pub use browser::{BrowserFetcher, BrowserLauncher, BrowserSession, ChromeLauncher, PageResponse};
pub use error::FetchError;
pub use fallback::FallbackFetcher;
pub use http::HttpFetcher;

/// Something that turns a URL into upstream JSON.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;

    /// Short label for logs ("http", "browser", ...)
    fn name(&self) -> &'static str;
}

/// Which strategy a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    #[default]
    Http,
    Browser,
    Fallback,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown fetch mode '{0}' (expected http, browser or fallback)")]
pub struct UnknownFetchMode(pub String);

impl FromStr for FetchMode {
    type Err = UnknownFetchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(FetchMode::Http),
            "browser" => Ok(FetchMode::Browser),
            "fallback" => Ok(FetchMode::Fallback),
            _ => Err(UnknownFetchMode(s.to_string())),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchMode::Http => "http",
            FetchMode::Browser => "browser",
            FetchMode::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// One shared fetcher for the whole process; call sites never look at the mode.
pub fn build_fetcher(mode: FetchMode) -> Arc<dyn JsonFetcher> {
    match mode {
        FetchMode::Http => Arc::new(HttpFetcher::new()),
        FetchMode::Browser => Arc::new(BrowserFetcher::chrome()),
        FetchMode::Fallback => Arc::new(FallbackFetcher::new(
            Arc::new(HttpFetcher::new()),
            Arc::new(BrowserFetcher::chrome()),
        )),
    }
}
