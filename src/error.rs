//! Error handling for the fusion server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// A single endpoint attempt failed (swallowed by the resolver)
    #[error("Endpoint {endpoint} failed: {message}")]
    Endpoint { endpoint: String, message: String },

    /// Every endpoint (and fallback) for a logical device failed
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    /// Response parsed but did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial error: {0}")]
    Serial(String),

    /// Data log write/trim error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", msg.clone()),
            Error::Endpoint { endpoint, message } => (
                StatusCode::BAD_GATEWAY,
                "ENDPOINT_ERROR",
                format!("{}: {}", endpoint, message),
            ),
            Error::DeviceUnreachable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DEVICE_UNREACHABLE",
                msg.clone(),
            ),
            Error::Decode(msg) => (StatusCode::BAD_GATEWAY, "DECODE_ERROR", msg.clone()),
            Error::Http(e) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR", e.to_string()),
            Error::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                e.to_string(),
            ),
            Error::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", e.to_string()),
            Error::Serial(msg) => (StatusCode::BAD_GATEWAY, "SERIAL_ERROR", msg.clone()),
            Error::Persistence(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                msg.clone(),
            ),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
