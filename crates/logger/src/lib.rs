/// Quiniela proxy: logger
/// JSONL audit trail of upstream fetches and gist publishes

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct EventLogger {
    log_dir: PathBuf,
    // one writer at a time, lines from concurrent requests must not interleave
    write_lock: Mutex<()>,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir, write_lock: Mutex::new(()) }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct UpstreamStatusEvent {
    pub ts:          String,
    pub event:       &'static str,   // "UPSTREAM_STATUS"
    pub route:       String,         // "/quiniela" | "/api/proximo" | "/api/partidos/{fecha}"
    pub fetcher:     &'static str,   // "http" | "browser" | "fallback"
    pub ok:          bool,
    pub status_code: Option<u16>,    // upstream status when it answered with a block
    pub message:     String,
}

impl UpstreamStatusEvent {
    pub fn new(route: impl Into<String>, fetcher: &'static str, ok: bool, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            ts: now_iso(),
            event: "UPSTREAM_STATUS",
            route: route.into(),
            fetcher,
            ok,
            status_code,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct GistPublishEvent {
    pub ts:        String,
    pub event:     &'static str,   // "GIST_PUBLISH"
    pub gist_id:   String,
    pub filename:  String,
    pub matches:   usize,
    pub ok:        bool,
    pub html_url:  Option<String>,
    pub message:   String,
}
