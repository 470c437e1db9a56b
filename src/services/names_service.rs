//! Display names for the configured slots, persisted as one JSON file on
//! local disk.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::names::DisplayNames;
use crate::slots::SlotRegistry;

/// File-backed name store. Read-modify-write cycles are serialized by an
/// in-process mutex; a missing file reads as the default names, so the store
/// works on first boot without any seeding step.
pub struct NamesStore {
    path: PathBuf,
    registry: SlotRegistry,
    lock: Mutex<()>,
}

impl NamesStore {
    pub fn new(path: impl Into<PathBuf>, registry: SlotRegistry) -> Self {
        Self {
            path: path.into(),
            registry,
            lock: Mutex::new(()),
        }
    }

    pub async fn get(&self) -> Result<DisplayNames, AppError> {
        let _guard = self.lock.lock().await;
        self.read_current().await
    }

    /// Apply a partial update. Every key must resolve to a configured slot;
    /// one unknown key rejects the whole request before anything is written.
    pub async fn update(
        &self,
        changes: BTreeMap<String, String>,
    ) -> Result<DisplayNames, AppError> {
        let _guard = self.lock.lock().await;
        let mut names = self.read_current().await?;
        for (token, value) in changes {
            let slot = self.registry.resolve(&token)?;
            names.0.insert(slot.as_str().to_string(), value);
        }
        self.write_current(&names).await?;
        Ok(names)
    }

    async fn read_current(&self) -> Result<DisplayNames, AppError> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                AppError::Internal(anyhow::anyhow!(
                    "names file {} is not valid JSON: {err}",
                    self.path.display()
                ))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(DisplayNames::defaults(
                self.registry.slots().iter().map(|slot| slot.as_str()),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Write to a temp sibling, then rename over the real file so readers
    /// never observe a half-written document.
    async fn write_current(&self, names: &DisplayNames) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(names)
            .map_err(|err| AppError::Internal(anyhow::anyhow!("could not encode names: {err}")))?;

        let parent = self.path.parent().unwrap_or_else(|| "".as_ref());
        fs::create_dir_all(parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(&body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }
}
