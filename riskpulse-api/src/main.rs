//! RiskPulse API Server
//!
//! Serves the live dashboard stats stream and proxies customer lookups to
//! the scoring service.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, Method},
    Router,
};
use riskpulse_core::{ScoringConfig, StreamConfig};
use riskpulse_scoring::ScoringClient;
use riskpulse_services::StreamingHub;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Opens one streaming session per connected client
    pub hub: Arc<StreamingHub>,
    /// Direct scoring service access for one-off and proxy requests
    pub scoring: Arc<ScoringClient>,
}

/// Build the full router
pub fn app(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,riskpulse_api=debug")),
        )
        .init();

    info!("Starting RiskPulse API");

    let scoring_config = ScoringConfig::from_env().context("Invalid scoring configuration")?;
    let stream_config = StreamConfig::from_env().context("Invalid stream configuration")?;
    info!(
        "Scoring service at {} (timeout {:?})",
        scoring_config.base_url, scoring_config.timeout
    );
    info!(
        "Streaming every {:?}, heartbeat every {:?}",
        stream_config.poll_interval, stream_config.heartbeat_interval
    );

    let scoring = Arc::new(ScoringClient::new(&scoring_config)?);
    let hub = Arc::new(StreamingHub::new(scoring.clone(), stream_config));

    let state = AppState { hub, scoring };

    // Start server
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
