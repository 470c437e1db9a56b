//! Request-level orchestration: slot resolution, upload validation and
//! fan-out, latest-file lookup, inventory and purge pass-through.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tracing::warn;

use crate::errors::AppError;
use crate::models::report::ReportFile;
use crate::services::catalog::{IncomingFile, PurgeOutcome, ReportCatalog};
use crate::services::latest::Partitioned;
use crate::services::object_store::ObjectStore;
use crate::slots::{Slot, SlotRegistry};

/// Only declared media type accepted for uploads.
pub const PDF_MIME: &str = "application/pdf";

/// Result of one upload request. `multi` records whether the request
/// submitted more than one file; the response shape differs.
#[derive(Debug)]
pub struct UploadOutcome {
    pub reports: Vec<ReportFile>,
    pub multi: bool,
}

pub struct ReportService {
    registry: SlotRegistry,
    catalog: Arc<dyn ReportCatalog>,
    store: Arc<dyn ObjectStore>,
}

/// The declared media type decides; the payload bytes are never sniffed, so
/// a mislabeled PDF is rejected and a PDF-labeled text file goes through.
fn validate(file: &IncomingFile) -> Result<(), AppError> {
    let essence = file
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if !essence.eq_ignore_ascii_case(PDF_MIME) {
        return Err(AppError::UnsupportedMediaType);
    }
    if file.bytes.is_empty() {
        return Err(AppError::MissingPayload);
    }
    Ok(())
}

impl ReportService {
    pub fn new(
        registry: SlotRegistry,
        catalog: Arc<dyn ReportCatalog>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            registry,
            catalog,
            store,
        }
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn resolve_slot(&self, token: &str) -> Result<Slot, AppError> {
        self.registry.resolve(token)
    }

    /// Store every accepted file for `slot_token`, concurrently. A file that
    /// fails validation or upload is logged and skipped while its siblings
    /// proceed; only when every file fails does the request fail, with the
    /// first failure's error.
    pub async fn upload(
        &self,
        slot_token: &str,
        files: Vec<IncomingFile>,
    ) -> Result<UploadOutcome, AppError> {
        let slot = self.resolve_slot(slot_token)?;
        if files.is_empty() {
            return Err(AppError::MissingPayload);
        }
        let multi = files.len() > 1;

        let uploads = files.into_iter().map(|file| {
            let slot = slot.clone();
            async move {
                let name = file.original_filename.clone();
                let result = match validate(&file) {
                    Ok(()) => self.catalog.store_report(&slot, file).await,
                    Err(err) => Err(err),
                };
                (name, result)
            }
        });

        let mut reports = Vec::new();
        let mut first_error = None;
        for (name, result) in join_all(uploads).await {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => {
                    warn!(
                        "skipping file {}: {}",
                        name.as_deref().unwrap_or("<unnamed>"),
                        err
                    );
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if reports.is_empty() {
            return Err(first_error.unwrap_or(AppError::MissingPayload));
        }
        Ok(UploadOutcome { reports, multi })
    }

    pub async fn latest(&self, slot_token: &str) -> Result<ReportFile, AppError> {
        let slot = self.resolve_slot(slot_token)?;
        self.catalog.latest(&slot).await
    }

    /// Latest file plus its payload bytes, for the proxy download route.
    pub async fn fetch_latest(&self, slot_token: &str) -> Result<(ReportFile, Bytes), AppError> {
        let file = self.latest(slot_token).await?;
        let body = self.store.fetch(&file).await?;
        Ok((file, body))
    }

    pub async fn inventory(&self) -> Result<Partitioned, AppError> {
        self.catalog.inventory().await
    }

    pub async fn purge(&self) -> Result<PurgeOutcome, AppError> {
        self.catalog.purge().await
    }
}
