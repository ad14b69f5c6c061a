//! RiskPulse stream tail
//!
//! Mounts one feed provider and runs several independent consumers on it,
//! the way the dashboard, the sidebar badge and the alerts view share one
//! subscription.

use anyhow::Context;
use riskpulse_feed::{fetch_seed, stats_url_for, FeedConfig, FeedHandle, FeedProvider};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,riskpulse_feed=debug")),
        )
        .init();

    let config = FeedConfig::from_env().context("Invalid feed configuration")?;
    info!("Tailing {}", config.url);

    let stats_url = stats_url_for(&config.url);
    let provider = FeedProvider::http(config).context("Failed to create feed provider")?;

    let dashboard = provider.subscribe();
    let badge = provider.subscribe();
    let alerts = badge.clone();

    // Seed so consumers have something to render before the first event
    if let Some(seed) = fetch_seed(&stats_url).await {
        if dashboard.stats()?.is_none() {
            dashboard.set_stats(Some(seed))?;
        }
    }

    let consumers = vec![
        tokio::spawn(run_dashboard(dashboard)),
        tokio::spawn(run_badge(badge)),
        tokio::spawn(run_alerts(alerts)),
    ];

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    provider.shutdown();
    for consumer in consumers {
        consumer.abort();
    }

    let metrics = provider.metrics();
    info!(
        "Saw {} stats event(s), {} heartbeat(s) over {} connection(s)",
        metrics.stats_applied, metrics.heartbeats, metrics.connects
    );

    Ok(())
}

async fn run_dashboard(mut handle: FeedHandle) {
    while let Ok(state) = handle.changed().await {
        match &state.stats {
            Some(stats) => info!(
                connected = state.connected,
                total = ?stats.pointer_i64("/summary/totalCustomers"),
                critical = ?stats.pointer_i64("/summary/criticalRisk"),
                "[dashboard] stats updated"
            ),
            None => info!(connected = state.connected, "[dashboard] waiting for stats"),
        }
    }
}

async fn run_badge(mut handle: FeedHandle) {
    let mut last = None;
    while let Ok(state) = handle.changed().await {
        let count = state
            .stats
            .as_ref()
            .and_then(|s| s.pointer_i64("/summary/activeAlerts"));
        if count != last {
            info!("[badge] active alerts: {:?}", count);
            last = count;
        }
    }
}

async fn run_alerts(mut handle: FeedHandle) {
    let mut was_connected = false;
    while let Ok(state) = handle.changed().await {
        if was_connected && !state.connected {
            warn!("[alerts] live updates paused, showing last known stats");
        }
        was_connected = state.connected;
    }
}
