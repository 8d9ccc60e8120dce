//! Supabase-style object storage adapter.
//!
//! Uploads go to `{base}/storage/v1/object/{bucket}/{path}` with the service
//! key; the public URL is `{base}/storage/v1/object/public/{bucket}/{path}`.

use async_trait::async_trait;
use catalog_extraction::{ObjectStorage, StorageError};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: bucket.into(),
        }
    }

    pub fn upload_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        path: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        let failed = |reason: String| StorageError::Upload {
            path: path.to_string(),
            reason,
        };

        let response = self
            .client
            .post(self.upload_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, path = %path, error = %error_text, "Storage upload rejected");
            return Err(failed(format!("HTTP {}: {}", status, error_text)));
        }

        debug!(path = %path, size, "Uploaded object");
        Ok(self.public_url(path))
    }
}
