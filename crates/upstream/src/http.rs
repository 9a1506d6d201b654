use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::headers::disguise_header_map;
use crate::{FetchError, JsonFetcher};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain reqwest GET with the disguise headers. One attempt, no retry.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_client(
            reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        )
    }

    /// Headers are attached per request, so any client works here.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .headers(disguise_header_map())
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(format!("GET {url}: {e}")))?;

        let status = resp.status();
        debug!("upstream {} -> {}", url, status);
        if !status.is_success() {
            return Err(FetchError::Blocked { status: status.as_u16() });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Unreachable(format!("reading body of {url}: {e}")))?;

        serde_json::from_str(&body).map_err(|e| {
            FetchError::MalformedPayload(format!(
                "{url} is not JSON ({e}): {}",
                body.chars().take(80).collect::<String>()
            ))
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
