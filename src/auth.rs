//! Admin gate: a shared-password header checked by middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{AppState, errors::AppError};

/// Header the admin client sends the shared secret in.
pub const ADMIN_PASSWORD_HEADER: &str = "admin-password";

/// Reject the request unless the `admin-password` header matches the
/// configured secret. Plain string comparison of a cleartext header.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let supplied = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok());
    if supplied != Some(state.admin_password.as_str()) {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}
