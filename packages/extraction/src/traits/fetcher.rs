//! Fetcher trait for bounded HTTP GETs.
//!
//! Every network read in the pipeline (catalog PDF, vendor page, product
//! image) goes through a `Fetcher`, so each call carries an explicit timeout
//! and size cap, and tests can swap the network for canned responses.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::FetchResult;

/// A completed 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Bounds for a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl FetchLimits {
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        Self { timeout, max_bytes }
    }
}

/// HTTP GET with bounded time and size.
///
/// Implementations return `FetchError::Status` for non-2xx responses and
/// `FetchError::Timeout` when the limit elapses; they never block longer
/// than `limits.timeout`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str, limits: FetchLimits) -> FetchResult<FetchedResponse>;
}
