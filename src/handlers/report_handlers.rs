//! HTTP handlers for report upload, download, inventory and bulk deletion.
//!
//! Response bodies mirror the public contract exactly: camelCase envelope
//! keys (`downloadUrl`, `fileName`, `uploadedAt`, `deletedCount`,
//! `totalFiles`) around report objects serialized with their stored
//! snake_case fields.

use crate::{
    AppState,
    errors::AppError,
    services::catalog::IncomingFile,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};

/// Multipart field names carrying files; anything else is ignored.
const FILE_FIELDS: [&str; 3] = ["file", "file1", "file2"];

/// Fallback when a part arrives without a declared content type. Never a
/// PDF, so such parts fail validation downstream.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// A body over the router's size cap maps to [`AppError::PayloadTooLarge`];
/// any other defect in the stream reads as an unreadable request.
fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    AppError::Internal(anyhow::anyhow!("invalid multipart body: {err}"))
}

/// `POST /upload/{slot}`
///
/// Accepts one file under `file`, or two under `file1`/`file2`. The
/// response carries `report` for a single submitted file and `reports`
/// when the request submitted several.
pub async fn upload_report(
    State(state): State<AppState>,
    Path(slot): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        if !FILE_FIELDS.contains(&field_name.as_str()) {
            continue;
        }
        let original_filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or(UNKNOWN_MIME)
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push(IncomingFile {
            original_filename,
            content_type,
            bytes,
        });
    }

    let outcome = state.service.upload(&slot, files).await?;
    let body = if outcome.multi {
        json!({
            "message": "File uploaded successfully",
            "reports": outcome.reports,
        })
    } else {
        json!({
            "message": "File uploaded successfully",
            "report": outcome.reports.first(),
        })
    };
    Ok(Json(body))
}

/// `GET /download/{slot}`
///
/// Hands the client a direct store URL with the attachment flag appended,
/// not the bytes themselves.
pub async fn download_report(
    State(state): State<AppState>,
    Path(slot): Path<String>,
) -> Result<Json<Value>, AppError> {
    let file = state.service.latest(&slot).await?;
    Ok(Json(json!({
        "downloadUrl": format!("{}?fl_attachment", file.secure_url),
        "fileName": file.public_id,
        "uploadedAt": file.created_at,
    })))
}

/// `GET /download/{slot}/file`
///
/// Proxy variant: fetches the stored bytes and re-emits them as an
/// attachment, for clients that cannot follow the store URL directly.
pub async fn download_report_file(
    State(state): State<AppState>,
    Path(slot): Path<String>,
) -> Result<Response, AppError> {
    let (file, body) = state.service.fetch_latest(&slot).await?;

    let filename = file
        .public_id
        .rsplit('/')
        .next()
        .unwrap_or(&file.public_id)
        .to_string();
    let disposition = format!("attachment; filename=\"{filename}.pdf\"");

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    if let Some(etag) = file.etag.as_ref() {
        let quoted = format!("\"{etag}\"");
        if let Ok(value) = HeaderValue::from_str(&quoted) {
            headers.insert(header::ETAG, value);
        }
    }
    Ok(response)
}

/// `GET /reports`
///
/// One listing window bucketed per slot plus `other`; `totalFiles` counts
/// the window, so a file matching both slots is still counted once.
pub async fn list_reports(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let split = state.service.inventory().await?;

    let mut body = serde_json::Map::new();
    body.insert("totalFiles".to_string(), json!(split.total));
    for (slot, bucket) in &split.per_slot {
        body.insert(slot.as_str().to_string(), json!(bucket));
    }
    body.insert("other".to_string(), json!(split.other));
    Ok(Json(Value::Object(body)))
}

/// `DELETE /delete-all`
///
/// `deletedCount` is the number of deletions attempted; per-file failures
/// were already logged and do not reduce it.
pub async fn delete_all(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let outcome = state.service.purge().await?;
    Ok(Json(json!({
        "message": "All files deleted successfully",
        "deletedCount": outcome.attempted,
    })))
}
