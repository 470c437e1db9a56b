//! Stateless [`ReportCatalog`]: no local persistence, every answer is
//! derived from a fresh object-store listing.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::AppError;
use crate::models::report::ReportFile;
use crate::services::catalog::{
    DOWNLOAD_WINDOW, INVENTORY_WINDOW, IncomingFile, PurgeOutcome, ReportCatalog, purge_remote,
};
use crate::services::latest::{self, Partitioned};
use crate::services::object_store::ObjectStore;
use crate::slots::{Slot, SlotRegistry};

/// Derives state from the store itself. Upload keys embed the slot name and
/// a creation timestamp; lookups list a bounded window and pick by substring.
pub struct ListingCatalog {
    store: Arc<dyn ObjectStore>,
    registry: SlotRegistry,
    last_millis: AtomicI64,
}

impl ListingCatalog {
    pub fn new(store: Arc<dyn ObjectStore>, registry: SlotRegistry) -> Self {
        Self {
            store,
            registry,
            last_millis: AtomicI64::new(0),
        }
    }

    /// Millisecond stamp for the next upload key. Nudged past the previous
    /// stamp so two uploads landing in the same millisecond still get
    /// distinct keys.
    fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_millis
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

#[async_trait]
impl ReportCatalog for ListingCatalog {
    async fn store_report(&self, slot: &Slot, file: IncomingFile) -> Result<ReportFile, AppError> {
        let key = format!("{slot}_report_{}", self.next_millis());
        let stored = self
            .store
            .put(
                &key,
                file.original_filename.as_deref(),
                &file.content_type,
                file.bytes,
            )
            .await?;
        Ok(stored)
    }

    async fn latest(&self, slot: &Slot) -> Result<ReportFile, AppError> {
        let listing = self.store.list_recent(DOWNLOAD_WINDOW).await?;
        if listing.is_empty() {
            return Err(AppError::NotFound("No files found".to_string()));
        }
        latest::latest_for(&listing, slot)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No file found for {}", slot.typed())))
    }

    async fn inventory(&self) -> Result<Partitioned, AppError> {
        let listing = self.store.list_recent(INVENTORY_WINDOW).await?;
        Ok(latest::partition(&listing, &self.registry))
    }

    async fn purge(&self) -> Result<PurgeOutcome, AppError> {
        purge_remote(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::services::memory_store::MemoryStore;

    fn catalog() -> (Arc<MemoryStore>, ListingCatalog) {
        let store = Arc::new(MemoryStore::new("reports"));
        let registry = SlotRegistry::new("gurdeep", "kulwinder").unwrap();
        (store.clone(), ListingCatalog::new(store, registry))
    }

    fn pdf(name: &str) -> IncomingFile {
        IncomingFile {
            original_filename: Some(name.to_string()),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.7"),
        }
    }

    #[test]
    fn millis_stamps_never_repeat() {
        let (_, catalog) = catalog();
        let first = catalog.next_millis();
        let second = catalog.next_millis();
        let third = catalog.next_millis();
        assert!(second > first);
        assert!(third > second);
    }

    #[tokio::test]
    async fn upload_keys_embed_slot_and_timestamp() {
        let (_, catalog) = catalog();
        let slot = catalog.registry.resolve("Kulwinder").unwrap();
        let stored = catalog.store_report(&slot, pdf("cv.pdf")).await.unwrap();

        let stamp = stored
            .public_id
            .strip_prefix("reports/kulwinder_report_")
            .expect("key should carry the slot prefix");
        stamp.parse::<i64>().expect("key should end in a millis stamp");
    }

    #[tokio::test]
    async fn latest_picks_the_newest_upload_for_the_slot() {
        let (_, catalog) = catalog();
        let slot = catalog.registry.resolve("gurdeep").unwrap();
        catalog.store_report(&slot, pdf("old.pdf")).await.unwrap();
        let newest = catalog.store_report(&slot, pdf("new.pdf")).await.unwrap();

        let found = catalog.latest(&slot).await.unwrap();
        assert_eq!(found.public_id, newest.public_id);
    }

    #[tokio::test]
    async fn empty_store_reports_no_files_at_all() {
        let (_, catalog) = catalog();
        let slot = catalog.registry.resolve("kulwinder").unwrap();
        match catalog.latest(&slot).await.unwrap_err() {
            AppError::NotFound(message) => assert_eq!(message, "No files found"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_slot_reports_the_slot_name() {
        let (_, catalog) = catalog();
        let gurdeep = catalog.registry.resolve("gurdeep").unwrap();
        let kulwinder = catalog.registry.resolve("kulwinder").unwrap();
        catalog.store_report(&gurdeep, pdf("cv.pdf")).await.unwrap();

        match catalog.latest(&kulwinder).await.unwrap_err() {
            AppError::NotFound(message) => assert_eq!(message, "No file found for kulwinder"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_slot_echoes_the_caller_spelling() {
        let (_, catalog) = catalog();
        let gurdeep = catalog.registry.resolve("gurdeep").unwrap();
        let kulwinder = catalog.registry.resolve("KulWinder").unwrap();
        catalog.store_report(&gurdeep, pdf("cv.pdf")).await.unwrap();

        match catalog.latest(&kulwinder).await.unwrap_err() {
            AppError::NotFound(message) => assert_eq!(message, "No file found for KulWinder"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn inventory_buckets_by_slot() {
        let (store, catalog) = catalog();
        let gurdeep = catalog.registry.resolve("gurdeep").unwrap();
        let kulwinder = catalog.registry.resolve("kulwinder").unwrap();
        catalog.store_report(&gurdeep, pdf("a.pdf")).await.unwrap();
        catalog.store_report(&kulwinder, pdf("b.pdf")).await.unwrap();
        store
            .put("stray_object", None, "application/pdf", Bytes::new())
            .await
            .unwrap();

        let split = catalog.inventory().await.unwrap();
        assert_eq!(split.total, 3);
        assert_eq!(split.per_slot[0].1.len(), 1);
        assert_eq!(split.per_slot[1].1.len(), 1);
        assert_eq!(split.other.len(), 1);
    }

    #[tokio::test]
    async fn purge_empties_the_managed_folder() {
        let (store, catalog) = catalog();
        let slot = catalog.registry.resolve("gurdeep").unwrap();
        catalog.store_report(&slot, pdf("a.pdf")).await.unwrap();
        catalog.store_report(&slot, pdf("b.pdf")).await.unwrap();

        let outcome = catalog.purge().await.unwrap();
        assert_eq!(outcome.attempted, 2);
        assert_eq!(store.object_count(), 0);
    }
}
