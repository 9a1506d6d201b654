/// Quiniela proxy: CORS proxy for loteriasyapuestas.es
///
/// What it does:
///   1. GET /quiniela → next draw date → fixtures of that draw
///   2. GET /api/proximo, /api/partidos/{fecha} → raw upstream JSON
///   3. Replaces upstream CORS headers with our own policy
///
/// Run:
///   QUINIELA_FETCH_MODE=fallback cargo run --bin quiniela-proxy
///
/// Env: QUINIELA_BIND | PORT, QUINIELA_ALLOWED_ORIGINS, QUINIELA_FETCH_MODE,
///      QUINIELA_EVENT_LOG_DIR

use anyhow::{Context, Result};
use dotenv::dotenv;
use proxy_server::ProxyConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = ProxyConfig::from_env().context("Invalid proxy configuration")?;
    info!("=== Quiniela proxy ===");
    info!("Upstream: {}", fixtures::NEXT_DRAW_URL);

    proxy_server::serve(config).await.context("proxy server stopped")?;
    Ok(())
}
