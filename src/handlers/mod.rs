pub mod analytics;
pub mod historical;
pub mod latency;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::telemetry::TelemetryError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Store(String),
    Internal(String),
}

impl From<TelemetryError> for AppError {
    fn from(e: TelemetryError) -> Self {
        match e {
            TelemetryError::InvalidSample(msg) => Self::BadRequest(msg),
            TelemetryError::StoreUnavailable(msg) => Self::Store(msg),
            TelemetryError::NoData => Self::Internal("no valid samples to aggregate".into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Store(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to store data: {msg}"),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
