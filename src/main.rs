//! Greenhouse Fusion Server
//!
//! Main entry point: wires configuration, starts the acquisition and
//! retention background tasks, and serves the read-only API.

use greenhouse_fusion::{acquisition, config::AppConfig, state::AppState, web_api, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenhouse_fusion=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        node_endpoints = config.node_endpoints.len(),
        camera_endpoints = config.camera_endpoints.len(),
        poll_secs = config.poll_interval.as_secs(),
        "Starting greenhouse fusion server"
    );

    let state = AppState::build(config.clone());

    state.scheduler.start().await;
    acquisition::start_retention(state.datalog.clone(), config.retention_sweep);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "API listening");

    let app = web_api::router(state);
    axum::serve(listener, app).await?;

    Ok(())
}
