//! Represents a report file held by the external object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single stored report file.
///
/// The object store owns the bytes and the canonical URL; this record is the
/// metadata the service works with. In the stateless design the record is
/// reconstructed from the store's listing on every read; in the stateful
/// design one record per slot lives in the catalog table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ReportFile {
    /// Store-side identifier. Embeds the slot name, and in the stateless
    /// design a millisecond timestamp (`<slot>_report_<millis>`).
    pub public_id: String,

    /// Canonical HTTPS URL for the stored bytes.
    pub secure_url: String,

    /// When the object was created in the store.
    pub created_at: DateTime<Utc>,

    /// Filename as supplied by the uploader, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,

    /// Store resource class. Always `raw` for PDF reports.
    pub resource_kind: String,

    /// Content checksum reported by the store, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ReportFile {
    /// True if this file's identifier embeds `needle`, case-insensitively.
    ///
    /// This is the identity check the stateless design relies on. A slot
    /// name that happens to appear inside an unrelated identifier matches
    /// too.
    pub fn embeds(&self, needle: &str) -> bool {
        self.public_id
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}
