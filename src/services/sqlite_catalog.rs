//! Stateful [`ReportCatalog`]: one SQLite row per slot plus a fixed store
//! key, so a re-upload overwrites instead of accumulating objects.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

use crate::errors::AppError;
use crate::models::report::ReportFile;
use crate::services::catalog::{IncomingFile, PurgeOutcome, ReportCatalog, purge_remote};
use crate::services::latest::Partitioned;
use crate::services::object_store::ObjectStore;
use crate::slots::{Slot, SlotRegistry};

const UPSERT_SQL: &str = r#"
INSERT INTO slot_reports (slot, public_id, secure_url, original_filename, resource_kind, etag, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(slot) DO UPDATE SET
    public_id = excluded.public_id,
    secure_url = excluded.secure_url,
    original_filename = excluded.original_filename,
    resource_kind = excluded.resource_kind,
    etag = excluded.etag,
    created_at = excluded.created_at
RETURNING public_id, secure_url, created_at, original_filename, resource_kind, etag
"#;

#[derive(FromRow)]
struct CatalogRow {
    slot: String,
    #[sqlx(flatten)]
    file: ReportFile,
}

/// Catalog with durable slot -> file pointers.
///
/// The replace sequence is read row, best-effort delete of the old remote
/// object, upload under the fixed key, upsert the row. Nothing serializes
/// two concurrent uploads to the same slot: the primary-key upsert makes the
/// row last-write-wins, and the losing upload's remote object may be left
/// orphaned. Accepted race.
pub struct SqliteCatalog {
    store: Arc<dyn ObjectStore>,
    pool: SqlitePool,
    registry: SlotRegistry,
}

impl SqliteCatalog {
    pub fn new(store: Arc<dyn ObjectStore>, pool: SqlitePool, registry: SlotRegistry) -> Self {
        Self {
            store,
            pool,
            registry,
        }
    }

    fn slot_key(slot: &Slot) -> String {
        format!("{slot}_report")
    }

    async fn row_for(&self, slot: &Slot) -> Result<Option<ReportFile>, sqlx::Error> {
        sqlx::query_as::<_, ReportFile>(
            "SELECT public_id, secure_url, created_at, original_filename, resource_kind, etag \
             FROM slot_reports WHERE slot = ?",
        )
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await
    }
}

/// Create the catalog table. Comment lines are dropped before the file is
/// split on `;`, so a semicolon inside a comment is not a statement break.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    run_statements(pool, include_str!("../../migrations/0001_init.sql")).await
}

async fn run_statements(pool: &SqlitePool, schema_sql: &str) -> Result<(), sqlx::Error> {
    let executable = schema_sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let statements: Vec<&str> = executable
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .collect();

    tracing::info!("Running {} schema statements...", statements.len());
    for stmt in statements {
        tracing::debug!("Executing schema SQL: {}", stmt);
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

#[async_trait]
impl ReportCatalog for SqliteCatalog {
    async fn store_report(&self, slot: &Slot, file: IncomingFile) -> Result<ReportFile, AppError> {
        if let Some(previous) = self.row_for(slot).await? {
            // Best effort: a failed cleanup must not block the new upload.
            if let Err(err) = self.store.delete(&previous.public_id).await {
                warn!(
                    "failed to delete previous object {}: {}",
                    previous.public_id, err
                );
            }
        }

        let stored = self
            .store
            .put(
                &Self::slot_key(slot),
                file.original_filename.as_deref(),
                &file.content_type,
                file.bytes,
            )
            .await?;

        let recorded = sqlx::query_as::<_, ReportFile>(UPSERT_SQL)
            .bind(slot.as_str())
            .bind(&stored.public_id)
            .bind(&stored.secure_url)
            .bind(&stored.original_filename)
            .bind(&stored.resource_kind)
            .bind(&stored.etag)
            .bind(stored.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(recorded)
    }

    async fn latest(&self, slot: &Slot) -> Result<ReportFile, AppError> {
        self.row_for(slot)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No file found for {}", slot.typed())))
    }

    async fn inventory(&self) -> Result<Partitioned, AppError> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            "SELECT slot, public_id, secure_url, created_at, original_filename, resource_kind, etag \
             FROM slot_reports ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut split = Partitioned {
            per_slot: self
                .registry
                .slots()
                .iter()
                .map(|slot| (slot.clone(), Vec::new()))
                .collect(),
            other: Vec::new(),
            total: rows.len(),
        };
        for row in rows {
            match split
                .per_slot
                .iter_mut()
                .find(|(slot, _)| slot.as_str() == row.slot)
            {
                Some((_, bucket)) => bucket.push(row.file),
                None => split.other.push(row.file),
            }
        }
        Ok(split)
    }

    async fn purge(&self) -> Result<PurgeOutcome, AppError> {
        // Rows are dropped even when the remote namespace turned out to be
        // empty; only a listing failure leaves the table untouched.
        match purge_remote(self.store.as_ref()).await {
            Ok(outcome) => {
                sqlx::query("DELETE FROM slot_reports")
                    .execute(&self.pool)
                    .await?;
                Ok(outcome)
            }
            Err(err @ AppError::NotFound(_)) => {
                sqlx::query("DELETE FROM slot_reports")
                    .execute(&self.pool)
                    .await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sqlx::sqlite::SqlitePoolOptions;
    use crate::services::memory_store::MemoryStore;

    async fn test_pool() -> SqlitePool {
        // In-memory SQLite databases are per-connection, so the pool must
        // stay on a single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        pool
    }

    async fn catalog() -> (Arc<MemoryStore>, SqliteCatalog) {
        let store = Arc::new(MemoryStore::new("reports"));
        let registry = SlotRegistry::new("gurdeep", "kulwinder").unwrap();
        let pool = test_pool().await;
        (store.clone(), SqliteCatalog::new(store, pool, registry))
    }

    fn pdf(name: &str, body: &'static [u8]) -> IncomingFile {
        IncomingFile {
            original_filename: Some(name.to_string()),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(body),
        }
    }

    async fn row_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM slot_reports")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reupload_keeps_one_row_and_one_object() {
        let (store, catalog) = catalog().await;
        let slot = catalog.registry.resolve("kulwinder").unwrap();

        let first = catalog
            .store_report(&slot, pdf("v1.pdf", b"one"))
            .await
            .unwrap();
        let second = catalog
            .store_report(&slot, pdf("v2.pdf", b"two"))
            .await
            .unwrap();

        assert_eq!(row_count(&catalog.pool).await, 1);
        assert_eq!(store.object_count(), 1);
        assert_eq!(first.public_id, second.public_id);
        assert_ne!(first.secure_url, second.secure_url);

        let current = catalog.latest(&slot).await.unwrap();
        assert_eq!(current.secure_url, second.secure_url);
        assert_eq!(store.fetch(&current).await.unwrap(), Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn concurrent_uploads_leave_one_winning_row() {
        let (_, catalog) = catalog().await;
        let catalog = Arc::new(catalog);
        let slot = catalog.registry.resolve("gurdeep").unwrap();

        let a = tokio::spawn({
            let catalog = catalog.clone();
            let slot = slot.clone();
            async move { catalog.store_report(&slot, pdf("a.pdf", b"aaa")).await }
        });
        let b = tokio::spawn({
            let catalog = catalog.clone();
            let slot = slot.clone();
            async move { catalog.store_report(&slot, pdf("b.pdf", b"bbb")).await }
        });
        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        assert_eq!(row_count(&catalog.pool).await, 1);
        let current = catalog.latest(&slot).await.unwrap();
        assert!(
            current.secure_url == first.secure_url || current.secure_url == second.secure_url,
            "winning row must come from one of the two uploads"
        );
    }

    #[tokio::test]
    async fn unknown_slot_is_not_found_by_name() {
        let (_, catalog) = catalog().await;
        let slot = catalog.registry.resolve("kulwinder").unwrap();
        match catalog.latest(&slot).await.unwrap_err() {
            AppError::NotFound(message) => assert_eq!(message, "No file found for kulwinder"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_row_echoes_the_caller_spelling() {
        let (_, catalog) = catalog().await;
        let slot = catalog.registry.resolve("GURDEEP").unwrap();
        match catalog.latest(&slot).await.unwrap_err() {
            AppError::NotFound(message) => assert_eq!(message, "No file found for GURDEEP"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn schema_reapplies_on_an_existing_database() {
        let pool = test_pool().await;
        apply_schema(&pool).await.unwrap();
        assert_eq!(row_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn comment_semicolons_do_not_split_statements() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_statements(
            &pool,
            "-- pointer table; one row per slot\n\
             CREATE TABLE IF NOT EXISTS fixture (id TEXT PRIMARY KEY);\n",
        )
        .await
        .unwrap();
        sqlx::query("INSERT INTO fixture (id) VALUES ('x')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inventory_buckets_rows_by_slot_column() {
        let (_, catalog) = catalog().await;
        let gurdeep = catalog.registry.resolve("gurdeep").unwrap();
        catalog
            .store_report(&gurdeep, pdf("a.pdf", b"aaa"))
            .await
            .unwrap();
        // A stale row from a slot that is no longer configured.
        sqlx::query(
            "INSERT INTO slot_reports (slot, public_id, secure_url, resource_kind, created_at) \
             VALUES ('ghost', 'reports/ghost_report', 'https://cdn.test/ghost', 'raw', '2024-01-01T00:00:00Z')",
        )
        .execute(&catalog.pool)
        .await
        .unwrap();

        let split = catalog.inventory().await.unwrap();
        assert_eq!(split.total, 2);
        assert_eq!(split.per_slot[0].1.len(), 1);
        assert_eq!(split.per_slot[1].1.len(), 0);
        assert_eq!(split.other.len(), 1);
        assert_eq!(split.other[0].public_id, "reports/ghost_report");
    }

    #[tokio::test]
    async fn purge_clears_rows_and_objects() {
        let (store, catalog) = catalog().await;
        let slot = catalog.registry.resolve("kulwinder").unwrap();
        catalog
            .store_report(&slot, pdf("a.pdf", b"aaa"))
            .await
            .unwrap();

        let outcome = catalog.purge().await.unwrap();
        assert_eq!(outcome.attempted, 1);
        assert_eq!(store.object_count(), 0);
        assert_eq!(row_count(&catalog.pool).await, 0);
    }

    #[tokio::test]
    async fn purge_drops_stale_rows_even_when_the_store_is_empty() {
        let (_, catalog) = catalog().await;
        sqlx::query(
            "INSERT INTO slot_reports (slot, public_id, secure_url, resource_kind, created_at) \
             VALUES ('gurdeep', 'reports/gurdeep_report', 'https://cdn.test/gurdeep', 'raw', '2024-01-01T00:00:00Z')",
        )
        .execute(&catalog.pool)
        .await
        .unwrap();

        match catalog.purge().await.unwrap_err() {
            AppError::NotFound(message) => assert_eq!(message, "No files to delete"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(row_count(&catalog.pool).await, 0);
    }
}
