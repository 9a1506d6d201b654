//! Diagnostic binary: hits proximosv3 through each fetch strategy and reports
//! which ones get through from this machine.
//! Usage: cargo run --bin fetch-probe [http|browser|fallback ...]

use anyhow::Result;
use fixtures::{FixtureResolver, NEXT_DRAW_URL};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use upstream::{build_fetcher, FetchMode};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let modes: Vec<FetchMode> = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            vec![FetchMode::Http, FetchMode::Browser]
        } else {
            args.iter().map(|a| a.parse()).collect::<Result<_, _>>()?
        }
    };

    info!("Probing {} via {:?}", NEXT_DRAW_URL, modes);

    for mode in modes {
        let fetcher = build_fetcher(mode);
        let started = Instant::now();

        match fetcher.fetch_json(NEXT_DRAW_URL).await {
            Ok(value) => {
                let fecha = value
                    .pointer("/0/fecha")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?");
                info!("[{}] OK in {:?}, next draw fecha={}", mode, started.elapsed(), fecha);

                let resolver = FixtureResolver::new(fetcher);
                match resolver.resolve().await {
                    Ok(record) => info!("[{}] fixtures OK: {} matches", mode, record.partidos().len()),
                    Err(e) => warn!("[{}] fixtures failed: {}", mode, e),
                }
            }
            Err(e) => warn!("[{}] FAILED in {:?}: {}", mode, started.elapsed(), e),
        }
    }

    Ok(())
}
