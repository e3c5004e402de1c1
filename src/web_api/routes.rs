//! API route handlers

use crate::error::{Error, Result};
use crate::fusion::{ConnectionStatus, FusedState};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /api/sensors - latest fused snapshot
pub async fn latest_sensors(State(state): State<AppState>) -> Json<FusedState> {
    let latest = state.store.latest().await;
    Json((*latest).clone())
}

/// GET /api/health - connectivity and logging status
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let latest = state.store.latest().await;
    let logging = tokio::fs::try_exists(state.config.csv_path())
        .await
        .unwrap_or(false);

    Json(json!({
        "status": "healthy",
        "node_connected": latest.node_status != ConnectionStatus::Disconnected,
        "camera_connected": latest.camera_status == ConnectionStatus::Connected,
        "sensors_working": latest.air.as_ref().map(|a| a.sensor_count).unwrap_or(0),
        "data_logging": logging,
        "last_cycle": latest.timestamp.to_rfc3339(),
    }))
}

/// GET /export/csv - download the data log
pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let path = state.config.csv_path();
    let body = tokio::fs::read(&path)
        .await
        .map_err(|_| Error::Persistence(format!("data log not found: {}", path.display())))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"precision_sensor_data.csv\"".to_string(),
            ),
        ],
        body,
    ))
}
