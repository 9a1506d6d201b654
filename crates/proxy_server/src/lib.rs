//! Quiniela proxy — HTTP facade
//!
//!   GET /quiniela               fixtures of the next draw (two upstream calls)
//!   GET /api/proximo            raw proximosv3
//!   GET /api/partidos/{fecha}   raw fechav3 for YYYYMMDD
//!   GET /health                 "ok"
//!
//! Success = upstream JSON with status 200. Any failure = 500 `{error, details}`.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use fixtures::{FixtureRecord, FixtureResolver, ResolutionError};
use logger::{EventLogger, UpstreamStatusEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod cors;
pub mod error;

pub use config::{AllowedOrigins, ConfigError, ProxyConfig};
pub use error::ApiError;

const QUINIELA_ERROR: &str = "proxy query failed";
const PROXIMO_ERROR: &str = "failed to fetch the next draw date from the lottery API";
const PARTIDOS_ERROR: &str = "failed to fetch the fixtures from the lottery API";

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<FixtureResolver>,
    events: Option<Arc<EventLogger>>,
}

impl AppState {
    pub fn new(resolver: Arc<FixtureResolver>, events: Option<Arc<EventLogger>>) -> Self {
        Self { resolver, events }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        let fetcher = upstream::build_fetcher(config.fetch_mode);
        let events = config
            .event_log_dir
            .as_ref()
            .map(|dir| Arc::new(EventLogger::new(dir)));
        Self::new(Arc::new(FixtureResolver::new(fetcher)), events)
    }

    fn record<T>(&self, route: &str, result: &Result<T, ResolutionError>) {
        let Some(events) = &self.events else { return };

        let fetcher = self.resolver.fetcher_name();
        let event = match result {
            Ok(_) => UpstreamStatusEvent::new(route, fetcher, true, None, "ok"),
            Err(e) => {
                let status = match e {
                    ResolutionError::Upstream(fetch) => fetch.status(),
                    _ => None,
                };
                UpstreamStatusEvent::new(route, fetcher, false, status, e.to_string())
            }
        };
        if let Err(e) = events.log(&event) {
            warn!("event log write failed: {}", e);
        }
    }
}

async fn quiniela(State(state): State<AppState>) -> Result<Json<FixtureRecord>, ApiError> {
    let result = state.resolver.resolve().await;
    state.record("/quiniela", &result);
    result.map(Json).map_err(|e| {
        warn!("/quiniela failed: {}", e);
        ApiError::new(QUINIELA_ERROR, e)
    })
}

async fn proximo(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let result = state.resolver.next_draw().await;
    state.record("/api/proximo", &result);
    result.map(Json).map_err(|e| {
        warn!("/api/proximo failed: {}", e);
        ApiError::new(PROXIMO_ERROR, e)
    })
}

async fn partidos(State(state): State<AppState>, Path(fecha): Path<String>) -> Result<Json<Value>, ApiError> {
    let result = state.resolver.fixtures_for(&fecha).await;
    state.record("/api/partidos/{fecha}", &result);
    result.map(Json).map_err(|e| {
        warn!("/api/partidos/{} failed: {}", fecha, e);
        ApiError::new(PARTIDOS_ERROR, e)
    })
}

pub fn router(state: AppState, origins: &AllowedOrigins) -> Router {
    let routes = Router::new()
        .route("/quiniela", get(quiniela))
        .route("/api/proximo", get(proximo))
        .route("/api/partidos/{fecha}", get(partidos))
        .route("/health", get(|| async { "ok" }))
        .with_state(state);

    cors::apply(routes, origins).layer(TraceLayer::new_for_http())
}

pub async fn serve(config: ProxyConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config);
    let app = router(state, &config.allowed_origins);

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        "quiniela proxy listening on http://{} (fetch mode: {}, origins: {:?})",
        listener.local_addr()?,
        config.fetch_mode,
        config.allowed_origins
    );
    if let Some(dir) = &config.event_log_dir {
        info!("event log: {}/*.jsonl", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("ctrl-c handler failed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
