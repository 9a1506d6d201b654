//! gist-sync — publishes the current Quiniela fixtures into a GitHub gist
//!
//! Static frontends read `partidos.json` straight from the gist, so they never
//! have to talk to the lottery API (or to our proxy) at all.
//!
//! Run (from cron, once a day is enough):
//!   GIST_UPDATE_TOKEN=ghp_... cargo run --bin gist-sync
//!
//! Env: GIST_UPDATE_TOKEN (required), GIST_ID, GIST_FILENAME,
//!      QUINIELA_FETCH_MODE, QUINIELA_EVENT_LOG_DIR

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use fixtures::{FixtureRecord, FixtureResolver};
use logger::{now_iso, EventLogger, GistPublishEvent};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};
use upstream::{build_fetcher, FetchMode};

const DEFAULT_GIST_ID: &str = "d6b5be152cf5e3f6ebb02f2daa60f291";
const DEFAULT_GIST_FILENAME: &str = "partidos.json";
const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GistResponse {
    html_url: Option<String>,
}

/// PATCH body replacing one file of the gist.
fn gist_patch_body(filename: &str, record: &FixtureRecord) -> Result<Value> {
    let content = serde_json::to_string_pretty(record).context("serialize fixtures")?;
    Ok(json!({ "files": { filename: { "content": content } } }))
}

async fn update_gist(
    client: &reqwest::Client,
    gist_id: &str,
    filename: &str,
    token: &str,
    record: &FixtureRecord,
) -> Result<Option<String>> {
    let url = format!("{GITHUB_API}/gists/{gist_id}");
    let body = gist_patch_body(filename, record)?;

    info!("Updating gist {} (file {})...", gist_id, filename);
    let resp = client
        .patch(&url)
        .header("Authorization", format!("token {token}"))
        .header("Accept", "application/vnd.github.v3+json")
        .header("User-Agent", "quiniela-proxy-gist-sync")
        .json(&body)
        .send()
        .await
        .context("Gist request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!(
            "GitHub answered {status} (check GIST_ID and GIST_UPDATE_TOKEN): {}",
            text.chars().take(200).collect::<String>()
        );
    }

    let gist: GistResponse = resp.json().await.context("Gist response is not JSON")?;
    Ok(gist.html_url)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = env::var("GIST_UPDATE_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .context("GIST_UPDATE_TOKEN is not set")?;
    let gist_id = env::var("GIST_ID").unwrap_or_else(|_| DEFAULT_GIST_ID.to_string());
    let filename = env::var("GIST_FILENAME").unwrap_or_else(|_| DEFAULT_GIST_FILENAME.to_string());
    let mode: FetchMode = match env::var("QUINIELA_FETCH_MODE") {
        Ok(raw) => raw.parse()?,
        Err(_) => FetchMode::Http,
    };
    let events = env::var("QUINIELA_EVENT_LOG_DIR").ok().map(EventLogger::new);

    info!("Fetching Quiniela fixtures (fetch mode: {})...", mode);
    let resolver = FixtureResolver::new(build_fetcher(mode));
    let record = match resolver.resolve().await {
        Ok(record) => record,
        Err(e) => {
            error!("Fixture fetch failed, gist left untouched: {}", e);
            return Err(e).context("fixture resolution failed");
        }
    };
    info!("Got {} matches", record.partidos().len());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let outcome = update_gist(&client, &gist_id, &filename, &token, &record).await;

    if let Some(events) = &events {
        let (ok, html_url, message) = match &outcome {
            Ok(url) => (true, url.clone(), "ok".to_string()),
            Err(e) => (false, None, format!("{e:#}")),
        };
        let _ = events.log(&GistPublishEvent {
            ts: now_iso(),
            event: "GIST_PUBLISH",
            gist_id: gist_id.clone(),
            filename: filename.clone(),
            matches: record.partidos().len(),
            ok,
            html_url,
            message,
        });
    }

    let html_url = outcome?;
    info!("Gist updated: {}", html_url.as_deref().unwrap_or("(no html_url in response)"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_body_wraps_pretty_record_under_filename() {
        let record = FixtureRecord::from_value(json!({
            "jornada": 38,
            "partidos": [{"home": "Betis", "away": "Málaga"}]
        }))
        .unwrap();

        let body = gist_patch_body("partidos.json", &record).unwrap();

        let content = body["files"]["partidos.json"]["content"].as_str().unwrap();
        assert!(content.contains('\n'), "content should be pretty-printed");
        assert!(content.contains("Málaga"), "non-ASCII must survive unescaped");
        let parsed: Value = serde_json::from_str(content).unwrap();
        assert_eq!(parsed["partidos"][0]["home"], "Betis");
        assert_eq!(parsed["jornada"], 38);
    }
}
