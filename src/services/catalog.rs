//! Report catalog: the keying strategy plus whatever bookkeeping the
//! deployment mode layers on top of the raw object store.
//!
//! Two implementations exist. [`ListingCatalog`] is stateless: every answer
//! is derived from a fresh store listing. [`SqliteCatalog`] keeps one
//! database row per slot and overwrites a fixed store key on re-upload.
//!
//! [`ListingCatalog`]: crate::services::listing_catalog::ListingCatalog
//! [`SqliteCatalog`]: crate::services::sqlite_catalog::SqliteCatalog

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tracing::warn;

use crate::errors::AppError;
use crate::models::report::ReportFile;
use crate::services::latest::Partitioned;
use crate::services::object_store::ObjectStore;
use crate::slots::Slot;

/// Listing cap when resolving the latest file for one slot.
pub const DOWNLOAD_WINDOW: usize = 30;
/// Listing cap for the partitioned inventory.
pub const INVENTORY_WINDOW: usize = 50;
/// Listing cap for bulk deletion.
pub const PURGE_WINDOW: usize = 100;

/// One validated file ready to be stored.
pub struct IncomingFile {
    pub original_filename: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Result of a bulk deletion. Every object in the window was attempted
/// exactly once; failed identifiers were logged and recorded, not retried.
#[derive(Debug)]
pub struct PurgeOutcome {
    pub attempted: usize,
    pub failed: Vec<String>,
}

#[async_trait]
pub trait ReportCatalog: Send + Sync {
    /// Store one file for `slot` and return its stored form.
    async fn store_report(&self, slot: &Slot, file: IncomingFile) -> Result<ReportFile, AppError>;

    /// The current file for `slot`, or `NotFound` carrying the
    /// caller-facing message.
    async fn latest(&self, slot: &Slot) -> Result<ReportFile, AppError>;

    /// Everything the catalog tracks, bucketed per slot.
    async fn inventory(&self) -> Result<Partitioned, AppError>;

    /// Delete every tracked file. An empty catalog is reported as
    /// `NotFound("No files to delete")`.
    async fn purge(&self) -> Result<PurgeOutcome, AppError>;
}

/// Remote half of `purge`, shared by both catalogs: list one window, fan the
/// deletions out concurrently, join them all. There is no rollback and no
/// short-circuit; the attempted count is the window size regardless of how
/// many deletions actually succeeded.
pub(crate) async fn purge_remote(store: &dyn ObjectStore) -> Result<PurgeOutcome, AppError> {
    let listing = store.list_recent(PURGE_WINDOW).await?;
    if listing.is_empty() {
        return Err(AppError::NotFound("No files to delete".to_string()));
    }

    let deletions = listing.iter().map(|file| {
        let public_id = file.public_id.clone();
        async move {
            let result = store.delete(&public_id).await;
            (public_id, result)
        }
    });

    let mut failed = Vec::new();
    for (public_id, result) in join_all(deletions).await {
        if let Err(err) = result {
            warn!("failed to delete {}: {}", public_id, err);
            failed.push(public_id);
        }
    }

    Ok(PurgeOutcome {
        attempted: listing.len(),
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryStore;

    #[tokio::test]
    async fn purging_an_empty_store_is_not_found() {
        let store = MemoryStore::new("reports");
        let err = purge_remote(&store).await.unwrap_err();
        match err {
            AppError::NotFound(message) => assert_eq!(message, "No files to delete"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn purge_attempts_every_listed_object() {
        let store = MemoryStore::new("reports");
        for i in 0..3 {
            store
                .put(&format!("a_report_{i}"), None, "application/pdf", Bytes::new())
                .await
                .unwrap();
        }

        let outcome = purge_remote(&store).await.unwrap();
        assert_eq!(outcome.attempted, 3);
        assert!(outcome.failed.is_empty());
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn failed_deletions_are_recorded_but_do_not_shrink_the_count() {
        let store = MemoryStore::new("reports");
        store
            .put("a_report_1", None, "application/pdf", Bytes::new())
            .await
            .unwrap();
        store
            .put("b_report_2", None, "application/pdf", Bytes::new())
            .await
            .unwrap();
        store.fail_deletes_of("reports/a_report_1");

        let outcome = purge_remote(&store).await.unwrap();
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.failed, vec!["reports/a_report_1".to_string()]);
        // The failed object is still there; nobody retries it.
        assert_eq!(store.object_count(), 1);
    }
}
