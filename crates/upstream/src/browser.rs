//! Headless Chrome fallback for hosts where plain HTTP gets 403.
//!
//! Each call launches its own browser, loads the JSON URL as a page and reads
//! the document's status and raw body off the network layer. No pooling: the
//! browser lives exactly as long as one fetch and `SessionGuard` closes it on
//! every exit path.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use headless_chrome::browser::tab::ResponseHandler;
use headless_chrome::protocol::cdp::Network::ResourceType;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, info};

use crate::headers::{disguise_headers, ACCEPT_LANGUAGE, USER_AGENT};
use crate::{FetchError, JsonFetcher};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Status + raw body of the document response of one page load.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// One launched browser with one open page. Blocking API.
pub trait BrowserSession: Send {
    fn load(&mut self, url: &str, timeout: Duration) -> Result<PageResponse, FetchError>;

    /// Must be idempotent.
    fn close(&mut self);
}

pub trait BrowserLauncher: Send + Sync + 'static {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// Closes the session when dropped.
struct SessionGuard(Box<dyn BrowserSession>);

impl SessionGuard {
    fn load(&mut self, url: &str, timeout: Duration) -> Result<PageResponse, FetchError> {
        self.0.load(url, timeout)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
        debug!("browser session closed");
    }
}

pub struct BrowserFetcher {
    launcher: Arc<dyn BrowserLauncher>,
    nav_timeout: Duration,
}

impl BrowserFetcher {
    pub fn chrome() -> Self {
        Self::with_launcher(Arc::new(ChromeLauncher))
    }

    pub fn with_launcher(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self { launcher, nav_timeout: NAVIGATION_TIMEOUT }
    }
}

fn fetch_blocking(launcher: &dyn BrowserLauncher, url: &str, timeout: Duration) -> Result<Value, FetchError> {
    let mut session = SessionGuard(launcher.launch()?);
    info!("browser launched, loading {}", url);

    let page = session.load(url, timeout)?;
    debug!("browser page status {}", page.status);
    if page.status >= 400 {
        return Err(FetchError::Blocked { status: page.status });
    }

    serde_json::from_str(page.body.trim()).map_err(|e| {
        FetchError::MalformedPayload(format!(
            "browser page for {url} is not JSON ({e}): {}",
            page.body.chars().take(80).collect::<String>()
        ))
    })
}

#[async_trait]
impl JsonFetcher for BrowserFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let launcher = Arc::clone(&self.launcher);
        let url = url.to_string();
        let timeout = self.nav_timeout;

        task::spawn_blocking(move || fetch_blocking(launcher.as_ref(), &url, timeout))
            .await
            .map_err(|e| FetchError::BrowserLaunch(format!("browser task aborted: {e}")))?
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

// ── Chrome ────────────────────────────────────────────────────────────────────

const DOCUMENT_HANDLER: &str = "quiniela-document";
/// How long to wait for `loadingFinished` of the document after navigation returns.
const DOCUMENT_SETTLE: Duration = Duration::from_secs(2);

/// The top-level document response as the network layer reported it.
#[derive(Debug, Clone)]
struct CapturedDocument {
    status: Option<u16>,
    body: Option<String>,
    base64_encoded: bool,
}

/// Turns what the network layer saw into a `PageResponse`. A load with no
/// document status is a failure, never an implicit 200.
fn decode_document(url: &str, captured: Option<CapturedDocument>) -> Result<PageResponse, FetchError> {
    let Some(CapturedDocument { status: Some(status), body, base64_encoded }) = captured else {
        return Err(FetchError::Unreachable(format!("Chrome saw no document response for {url}")));
    };

    let body = match body {
        Some(raw) if base64_encoded => BASE64
            .decode(raw.trim())
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        other => other,
    };

    match body {
        Some(body) => Ok(PageResponse { status, body }),
        // status alone decides a block
        None if status >= 400 => Ok(PageResponse { status, body: String::new() }),
        None => Err(FetchError::MalformedPayload(format!(
            "Chrome got status {status} for {url} but could not read the body"
        ))),
    }
}

pub struct ChromeLauncher;

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .ignore_certificate_errors(true)
            .args(vec![OsStr::new("--disable-features=site-per-process")])
            .build()
            .map_err(|e| FetchError::BrowserLaunch(format!("launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| FetchError::BrowserLaunch(format!("failed to launch Chrome: {e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::BrowserLaunch(format!("failed to create browser tab: {e:#}")))?;

        Ok(Box::new(ChromeSession { browser: Some(browser), tab }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Records the first document response of the tab, status and raw body.
    fn capture_document(&self) -> anyhow::Result<Arc<Mutex<Option<CapturedDocument>>>> {
        let slot: Arc<Mutex<Option<CapturedDocument>>> = Arc::default();
        let sink = Arc::clone(&slot);

        let handler: ResponseHandler = Box::new(move |params, fetch_body| {
            if !matches!(params.Type, ResourceType::Document) {
                return;
            }
            let mut captured = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if captured.is_some() {
                return;
            }
            let body = fetch_body().ok();
            *captured = Some(CapturedDocument {
                status: u16::try_from(params.response.status).ok(),
                base64_encoded: body.as_ref().is_some_and(|b| b.base_64_encoded),
                body: body.map(|b| b.body),
            });
        });
        self.tab.register_response_handling(DOCUMENT_HANDLER, handler)?;
        Ok(slot)
    }
}

fn wait_for_document(slot: &Mutex<Option<CapturedDocument>>) -> Option<CapturedDocument> {
    let deadline = Instant::now() + DOCUMENT_SETTLE;
    loop {
        let captured = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone();
        if captured.is_some() || Instant::now() >= deadline {
            return captured;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

impl BrowserSession for ChromeSession {
    fn load(&mut self, url: &str, timeout: Duration) -> Result<PageResponse, FetchError> {
        let nav_err = |stage: &str, e: anyhow::Error| FetchError::Unreachable(format!("Chrome {stage} failed for {url}: {e:#}"));

        self.tab.set_default_timeout(timeout);
        self.tab
            .set_user_agent(USER_AGENT, Some(ACCEPT_LANGUAGE), None)
            .map_err(|e| nav_err("set_user_agent", e))?;
        let headers: HashMap<&str, &str> = disguise_headers().into_iter().collect();
        self.tab
            .set_extra_http_headers(headers)
            .map_err(|e| nav_err("set_extra_http_headers", e))?;
        let slot = self.capture_document().map_err(|e| nav_err("network capture", e))?;

        // Navigation only, no network-idle wait: the document is the JSON itself.
        let navigated = self
            .tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| nav_err("navigate", e));
        let captured = navigated.map(|_| wait_for_document(&slot));
        let _ = self.tab.deregister_response_handling(DOCUMENT_HANDLER);

        decode_document(url, captured?)
    }

    fn close(&mut self) {
        // Dropping Browser kills the Chrome process.
        self.browser.take();
    }
}
