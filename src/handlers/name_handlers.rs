//! Display-name endpoints: admin read/write plus the public read.

use std::collections::BTreeMap;

use axum::{Json, extract::State};

use crate::{AppState, errors::AppError, models::names::DisplayNames};

/// `GET /api/names` (admin)
pub async fn get_names(State(state): State<AppState>) -> Result<Json<DisplayNames>, AppError> {
    let names = state.names.get().await?;
    Ok(Json(names))
}

/// `POST /api/names` (admin)
///
/// Partial update: only the submitted slots change. Unknown slot keys
/// reject the whole request.
pub async fn update_names(
    State(state): State<AppState>,
    Json(changes): Json<BTreeMap<String, String>>,
) -> Result<Json<DisplayNames>, AppError> {
    let updated = state.names.update(changes).await?;
    Ok(Json(updated))
}

/// `GET /public/names`
///
/// Same document as the admin read, without the password gate. The names
/// are display strings, not secrets.
pub async fn public_names(State(state): State<AppState>) -> Result<Json<DisplayNames>, AppError> {
    let names = state.names.get().await?;
    Ok(Json(names))
}
