// =============================================================================
// Watchlist Tracker: Main Entry Point
// =============================================================================
//
// Loads configuration and the watchlist, builds the price source and the
// evaluation pipeline, then serves the REST API until Ctrl+C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod evaluator;
mod indicators;
mod market_data;
mod pipeline;
mod ranking;
mod types;
mod watchlist;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::TrackerConfig;
use crate::market_data::{CachedPriceSource, PriceSource, YahooClient};
use crate::pipeline::EvaluationPipeline;
use crate::watchlist::{CsvWatchlistStore, Watchlist};

const DEFAULT_CONFIG_PATH: &str = "tracker_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Watchlist Tracker starting up");

    let config_path =
        std::env::var("TRACKER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = TrackerConfig::load_or_init(&config_path)
        .with_context(|| format!("unusable tracker config {config_path}"))?;
    config.apply_env_overrides();
    config.validate().context("invalid tracker configuration")?;

    info!(
        watchlist = %config.watchlist_path,
        lookback = %config.lookback,
        max_concurrent_fetches = config.max_concurrent_fetches,
        fetch_timeout_secs = config.fetch_timeout_secs,
        cache_ttl_secs = config.cache_ttl_secs,
        "Configuration ready"
    );

    // ── 2. Watchlist ─────────────────────────────────────────────────────
    let store = CsvWatchlistStore::new(&config.watchlist_path);
    info!(path = %store.path().display(), "Opening watchlist store");
    let watchlist = Arc::new(
        Watchlist::open(Box::new(store))
            .with_context(|| format!("watchlist store {} is unusable", config.watchlist_path))?,
    );
    info!(entries = watchlist.len(), "Watchlist ready");

    // ── 3. Price source ──────────────────────────────────────────────────
    let client = YahooClient::new(config.price_source_url.clone(), config.fetch_timeout())?;
    let source: Arc<dyn PriceSource> = match config.cache_ttl() {
        Some(ttl) => {
            let cached = Arc::new(CachedPriceSource::new(Arc::new(client), ttl));

            let sweeper = cached.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(ttl);
                loop {
                    interval.tick().await;
                    sweeper.evict_expired();
                }
            });

            info!(ttl_secs = ttl.as_secs(), "Series cache enabled");
            cached
        }
        None => Arc::new(client),
    };

    // ── 4. Pipeline & shared state ───────────────────────────────────────
    let pipeline = Arc::new(EvaluationPipeline::new(source, &config));
    let state = Arc::new(AppState::new(config, watchlist, pipeline));

    // ── 5. API server ────────────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!(
        evaluations = state.evaluations_run(),
        "Watchlist Tracker shut down complete."
    );
    Ok(())
}
