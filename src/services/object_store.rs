//! Outbound object-store seam.
//!
//! The external store owns file bytes and canonical URLs; the service only
//! ever talks to it through this trait. Production uses the HTTP-backed
//! [`CloudStore`](crate::services::cloud_store::CloudStore); local
//! development and tests use the in-process
//! [`MemoryStore`](crate::services::memory_store::MemoryStore).

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::report::ReportFile;

/// Resource class used for every report upload.
pub const RAW_RESOURCE_KIND: &str = "raw";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("object store returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("object `{0}` not found in store")]
    NotFound(String),

    #[error("could not decode object store response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw-binary object-store operations the service depends on.
///
/// Calls are attempted exactly once; there is no retry policy, and no
/// timeout beyond whatever the underlying client defaults to.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create one object under the managed folder. Exactly one new object
    /// per successful call.
    async fn put(
        &self,
        key: &str,
        original_filename: Option<&str>,
        content_type: &str,
        body: Bytes,
    ) -> StoreResult<ReportFile>;

    /// List up to `limit` objects from the managed folder, most recently
    /// created first. The store's own descending sort is the ordering the
    /// stateless latest-file selection relies on; implementations must
    /// honor it.
    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<ReportFile>>;

    /// Destroy one object by identifier, invalidating any cached copies.
    /// Destroying an identifier the store no longer knows is not an error.
    async fn delete(&self, public_id: &str) -> StoreResult<()>;

    /// Retrieve the payload bytes for a stored object. Used by the proxy
    /// download path that re-emits the bytes through this server.
    async fn fetch(&self, file: &ReportFile) -> StoreResult<Bytes>;
}
