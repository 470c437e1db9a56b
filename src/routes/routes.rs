//! Route table for the report service.
//!
//! ## Structure
//! - **Public endpoints**
//!   - `GET    /`                      — plain-text banner
//!   - `GET    /health`                — liveness JSON
//!   - `GET    /download/{slot}`       — latest-file download link
//!   - `GET    /download/{slot}/file`  — latest-file bytes, proxied
//!   - `GET    /reports`               — partitioned listing
//!   - `GET    /public/names`          — display names
//!
//! - **Admin endpoints** (require the `admin-password` header)
//!   - `POST   /upload/{slot}`         — multipart report upload
//!   - `DELETE /delete-all`            — bulk deletion
//!   - `GET    /api/names`             — display names
//!   - `POST   /api/names`             — partial display-name update
//!
//! Anything else falls through to a uniform JSON 404.

use crate::{
    AppState,
    auth::require_admin,
    errors::AppError,
    handlers::{
        health_handlers::{health, root},
        name_handlers::{get_names, public_names, update_names},
        report_handlers::{
            delete_all, download_report, download_report_file, list_reports, upload_report,
        },
    },
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Ceiling for upload request bodies. Breaches surface as the JSON
/// payload-too-large error while the multipart stream is read.
const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Build the full application router around shared state.
pub fn routes(state: AppState) -> Router {
    let admin = Router::new()
        .route("/upload/{slot}", post(upload_report))
        .route("/delete-all", delete(delete_all))
        .route("/api/names", get(get_names).post(update_names))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/download/{slot}", get(download_report))
        .route("/download/{slot}/file", get(download_report_file))
        .route("/reports", get(list_reports))
        .route("/public/names", get(public_names))
        .merge(admin)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
