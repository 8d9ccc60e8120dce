//! Object storage trait.

use async_trait::async_trait;

use crate::error::StorageError;

/// Durable blob storage with public URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload bytes under `path` and return the public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        path: &str,
    ) -> Result<String, StorageError>;
}
