// =============================================================================
// Stock Market Dashboard: Main Entry Point
// =============================================================================
//
// Serves a single-page dashboard: pick a company and a period, fetch daily
// OHLCV history from Yahoo Finance, overlay SMA 20 / SMA 50 / RSI 14 and
// render with Plotly in the browser.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod charts;
mod companies;
mod dashboard;
mod indicators;
mod market_data;
mod runtime_config;
mod types;
mod yahoo;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::DashboardConfig;
use crate::yahoo::YahooClient;

const CONFIG_PATH: &str = "dashboard_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Stock Market Dashboard, starting up");

    let mut config = if Path::new(CONFIG_PATH).exists() {
        DashboardConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            DashboardConfig::default()
        })
    } else {
        // First run: write the defaults out so they can be edited.
        let defaults = DashboardConfig::default();
        if let Err(e) = defaults.save(CONFIG_PATH) {
            warn!(error = %e, "Failed to write default config");
        }
        defaults
    };
    config.apply_env_overrides(|k| std::env::var(k).ok());

    info!(
        bind_addr = %config.bind_addr,
        cache_ttl_secs = config.cache_ttl_secs,
        default_period = %config.default_period,
        provider = %config.yahoo_base_url,
        "Configuration resolved"
    );

    // ── 2. Data source & shared state ────────────────────────────────────
    let client = YahooClient::new(&config).context("failed to build Yahoo client")?;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, Arc::new(client)));

    // ── 3. HTTP server ───────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Stock Market Dashboard shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
