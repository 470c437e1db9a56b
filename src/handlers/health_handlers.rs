//! Liveness handlers.
//!
//! - GET /        -> plain-text banner
//! - GET /health  -> JSON status with a server timestamp

use axum::{Json, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// `GET /`
///
/// Root probe used by uptime monitors. Plain text, never JSON.
pub async fn root() -> impl IntoResponse {
    "App is running.."
}

/// `GET /health`
///
/// Cheap liveness check; reports the wall clock so a cached response is
/// recognizable. Performs no I/O.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}
