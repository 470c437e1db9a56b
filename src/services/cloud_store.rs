//! HTTP-backed [`ObjectStore`] talking to the hosted file store.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::models::report::ReportFile;
use crate::services::object_store::{ObjectStore, StoreError, StoreResult};

/// Connection settings for the hosted store. `api_key`/`api_secret` are the
/// basic-auth pair for its management API.
#[derive(Debug, Clone)]
pub struct CloudStoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

pub struct CloudStore {
    http: Client,
    config: CloudStoreConfig,
}

#[derive(Deserialize)]
struct ListResponse {
    objects: Vec<ReportFile>,
}

impl CloudStore {
    /// Requests run with the client's default (unbounded) timeout, so a
    /// stalled store stalls the caller with it.
    pub fn new(mut config: CloudStoreConfig) -> StoreResult<Self> {
        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    fn object_url(&self, public_id: &str) -> String {
        format!("{}/objects/{public_id}", self.config.base_url)
    }

    async fn api_error(response: Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StoreError::Api { status, body }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ObjectStore for CloudStore {
    async fn put(
        &self,
        key: &str,
        original_filename: Option<&str>,
        content_type: &str,
        body: Bytes,
    ) -> StoreResult<ReportFile> {
        let url = self.object_url(&format!("{}/{key}", self.config.folder));
        let mut request = self
            .http
            .post(url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(name) = original_filename {
            request = request.query(&[("original_filename", name)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Self::decode(response).await
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<ReportFile>> {
        let response = self
            .http
            .get(format!("{}/objects", self.config.base_url))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[
                ("folder", self.config.folder.as_str()),
                ("max_results", &limit.to_string()),
                ("direction", "desc"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let listing: ListResponse = Self::decode(response).await?;
        Ok(listing.objects)
    }

    async fn delete(&self, public_id: &str) -> StoreResult<()> {
        let response = self
            .http
            .delete(self.object_url(public_id))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await?;
        // A missing object means someone else already removed it.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }

    async fn fetch(&self, file: &ReportFile) -> StoreResult<Bytes> {
        let response = self.http.get(&file.secure_url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(file.public_id.clone()));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> CloudStoreConfig {
        CloudStoreConfig {
            base_url: server.uri(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            folder: "reports".into(),
        }
    }

    fn remote_file(public_id: &str) -> serde_json::Value {
        json!({
            "public_id": public_id,
            "secure_url": format!("https://cdn.test/{public_id}"),
            "created_at": Utc::now().to_rfc3339(),
            "resource_kind": "raw",
            "etag": "abc123",
        })
    }

    #[tokio::test]
    async fn put_posts_bytes_and_decodes_the_stored_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/objects/reports/kulwinder_report_7"))
            .and(query_param("original_filename", "cv.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(remote_file("reports/kulwinder_report_7")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = CloudStore::new(config(&server)).unwrap();
        let file = store
            .put("kulwinder_report_7", Some("cv.pdf"), "application/pdf", Bytes::from("%PDF"))
            .await
            .unwrap();
        assert_eq!(file.public_id, "reports/kulwinder_report_7");
        assert_eq!(file.resource_kind, "raw");
    }

    #[tokio::test]
    async fn list_requests_a_descending_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/objects"))
            .and(query_param("folder", "reports"))
            .and(query_param("max_results", "30"))
            .and(query_param("direction", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "objects": [remote_file("reports/b_report_2"), remote_file("reports/a_report_1")],
            })))
            .mount(&server)
            .await;

        let store = CloudStore::new(config(&server)).unwrap();
        let listed = store.list_recent(30).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].public_id, "reports/b_report_2");
    }

    #[tokio::test]
    async fn delete_tolerates_an_already_missing_object() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/objects/reports/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = CloudStore::new(config(&server)).unwrap();
        store.delete("reports/gone").await.unwrap();
    }

    #[tokio::test]
    async fn upstream_failures_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/objects"))
            .respond_with(ResponseTemplate::new(500).set_body_string("store exploded"))
            .mount(&server)
            .await;

        let store = CloudStore::new(config(&server)).unwrap();
        let err = store.list_recent(30).await.unwrap_err();
        match err {
            StoreError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "store exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_follows_the_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/reports/a_report_1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".as_slice()))
            .mount(&server)
            .await;

        let store = CloudStore::new(config(&server)).unwrap();
        let file = ReportFile {
            public_id: "reports/a_report_1".into(),
            secure_url: format!("{}/files/reports/a_report_1", server.uri()),
            created_at: Utc::now(),
            original_filename: None,
            resource_kind: "raw".into(),
            etag: None,
        };
        assert_eq!(store.fetch(&file).await.unwrap(), Bytes::from_static(b"%PDF-1.7"));
    }
}
