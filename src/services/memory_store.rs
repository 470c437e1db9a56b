//! In-process [`ObjectStore`] used for local development and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::models::report::ReportFile;
use crate::services::object_store::{ObjectStore, RAW_RESOURCE_KIND, StoreError, StoreResult};

const BASE_URL: &str = "https://store.invalid";

struct StoredObject {
    file: ReportFile,
    body: Bytes,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, StoredObject>,
    seq: u64,
    fail_names: HashSet<String>,
    fail_deletes: HashSet<String>,
}

/// Keeps every object in a map keyed by public id. Writing an existing key
/// replaces the object and bumps the version embedded in its URL, mirroring
/// how the real store treats a re-used key.
pub struct MemoryStore {
    folder: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Make every upload whose original filename equals `name` fail with a
    /// store error. Lets tests exercise partial-failure paths.
    pub fn fail_uploads_named(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_names.insert(name.to_string());
    }

    /// Make deletions of `public_id` fail while leaving the object in place.
    pub fn fail_deletes_of(&self, public_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_deletes.insert(public_id.to_string());
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().unwrap().objects.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        original_filename: Option<&str>,
        _content_type: &str,
        body: Bytes,
    ) -> StoreResult<ReportFile> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(name) = original_filename
            && inner.fail_names.contains(name)
        {
            return Err(StoreError::Api {
                status: 500,
                body: format!("upload rejected for {name}"),
            });
        }

        inner.seq += 1;
        let seq = inner.seq;
        let public_id = format!("{}/{}", self.folder, key);
        let file = ReportFile {
            public_id: public_id.clone(),
            secure_url: format!("{BASE_URL}/raw/upload/v{seq}/{public_id}"),
            created_at: Utc::now(),
            original_filename: original_filename.map(str::to_string),
            resource_kind: RAW_RESOURCE_KIND.to_string(),
            etag: Some(format!("{:x}", md5::compute(&body))),
        };
        inner.objects.insert(
            public_id,
            StoredObject {
                file: file.clone(),
                body,
                seq,
            },
        );
        Ok(file)
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<ReportFile>> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<_> = inner.objects.values().collect();
        // Creation timestamps can collide within a millisecond; the write
        // sequence is the authoritative newest-first order.
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|entry| entry.file.clone())
            .collect())
    }

    async fn delete(&self, public_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_deletes.contains(public_id) {
            return Err(StoreError::Api {
                status: 500,
                body: format!("deletion rejected for {public_id}"),
            });
        }
        inner.objects.remove(public_id);
        Ok(())
    }

    async fn fetch(&self, file: &ReportFile) -> StoreResult<Bytes> {
        let inner = self.inner.lock().unwrap();
        inner
            .objects
            .get(&file.public_id)
            .map(|entry| entry.body.clone())
            .ok_or_else(|| StoreError::NotFound(file.public_id.clone()))
    }
}
