//! Web API - read-only presentation boundary
//!
//! ## Responsibilities
//!
//! - Serve the latest fused snapshot as JSON
//! - Health check (device connectivity + logging status)
//! - CSV data export
//!
//! The API only reads the state store; all mutation happens in the
//! acquisition task.

mod routes;

use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/api/sensors", get(routes::latest_sensors))
        .route("/api/health", get(routes::health))
        .route("/export/csv", get(routes::export_csv))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
