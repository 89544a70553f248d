// =============================================================================
// Cycle Sentinel — Main Entry Point
// =============================================================================
//
// Polls public market and sentiment sources on a fixed interval, scores the
// heat and accumulation tracks, raises alerts on tier changes and serves the
// latest snapshot over HTTP.  An invalid configuration aborts startup.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alerts;
mod api;
mod app_state;
mod cycle;
mod error;
mod indicators;
mod market_data;
mod pipeline;
mod runtime_config;
mod signals;
mod snapshot;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::alerts::{FanoutNotifier, LogNotifier, WebhookNotifier};
use crate::app_state::AppState;
use crate::market_data::HttpMarketData;
use crate::pipeline::RefreshPipeline;
use crate::runtime_config::{RuntimeConfig, DEFAULT_CONFIG_PATH};
use crate::snapshot::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Cycle Sentinel — Starting Up                      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = RuntimeConfig::load_or_default(&config_path)?;
    if !std::path::Path::new(&config_path).exists() {
        // Leave an editable copy of the defaults behind.
        if let Err(e) = config.save(&config_path) {
            warn!(error = %e, "failed to write default config");
        }
    }
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    info!(
        cycle_weight = config.cycle_weight,
        halving_epochs = config.halving_schedule.epochs().len(),
        refresh_secs = config.snapshot_refresh_secs,
        snapshot_path = %config.snapshot_path,
        webhook = config.webhook_url.is_some(),
        "configuration accepted"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let provider = Arc::new(HttpMarketData::new(&config)?);

    let mut notifier = FanoutNotifier::default().with(Arc::new(LogNotifier));
    if let Some(url) = &config.webhook_url {
        let hook = WebhookNotifier::new(url.clone(), Duration::from_secs(config.http_timeout_secs))?;
        notifier = notifier.with(Arc::new(hook));
    }
    info!(sinks = ?notifier.sink_names(), "alert sinks ready");

    let store = JsonFileStore::new(&config.snapshot_path);
    let restored = store.load_or_none();
    info!(path = %store.path().display(), restored = restored.is_some(), "snapshot store ready");

    // ── 3. Build shared state ────────────────────────────────────────────
    let pipeline = RefreshPipeline::new(&config, provider, notifier, Arc::new(store))
        .context("failed to build refresh pipeline")?;
    let state = Arc::new(AppState::new(
        Arc::new(pipeline),
        config.history_capacity,
        restored,
    ));

    // ── 4. Refresh loop ──────────────────────────────────────────────────
    let loop_state = state.clone();
    let refresh_every = config.refresh_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !loop_state.refresh().await {
                debug!("scheduled refresh skipped, a cycle is already running");
            }
        }
    });

    // ── 5. Start the API server ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping");

    info!(
        published = state.current_state_version(),
        uptime_secs = state.uptime_secs(),
        "Cycle Sentinel shut down complete."
    );
    Ok(())
}
