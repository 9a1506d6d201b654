use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::{FetchError, JsonFetcher};

/// Primary first; the fallback only gets the URL when the primary was bot-blocked.
pub struct FallbackFetcher {
    primary: Arc<dyn JsonFetcher>,
    fallback: Arc<dyn JsonFetcher>,
}

impl FallbackFetcher {
    pub fn new(primary: Arc<dyn JsonFetcher>, fallback: Arc<dyn JsonFetcher>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl JsonFetcher for FallbackFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        match self.primary.fetch_json(url).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_bot_block() => {
                warn!(
                    "{} fetch blocked ({}) on {}, trying {} fallback",
                    self.primary.name(),
                    err,
                    url,
                    self.fallback.name()
                );
                self.fallback.fetch_json(url).await
            }
            Err(err) => Err(err),
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
