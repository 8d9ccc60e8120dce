//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the extraction library
//! without making real AI, OCR, storage or network calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{AiError, FetchError, FetchResult, OcrError, RenderError, StorageError};
use crate::traits::{
    ai::{GenerateRequest, GenerateResponse, AI},
    fetcher::{FetchLimits, FetchedResponse, Fetcher},
    ocr::{Ocr, OcrText},
    renderer::PageRenderer,
    storage::ObjectStorage,
};

// ============================================================================
// AI
// ============================================================================

/// A mock AI implementation for testing.
///
/// Returns the configured text for every request and records each request
/// for assertions.
pub struct MockAI {
    response: String,
    usage: Option<(u64, u64)>,
    failure: Option<String>,
    grounding: bool,
    requests: Arc<RwLock<Vec<GenerateRequest>>>,
}

impl Default for MockAI {
    fn default() -> Self {
        Self {
            response: r#"{"products":[]}"#.to_string(),
            usage: None,
            failure: None,
            grounding: true,
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl MockAI {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text returned for every request.
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.response = text.into();
        self
    }

    /// Report token usage with every response.
    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some((prompt_tokens, completion_tokens));
        self
    }

    /// Fail every request with an API error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn without_grounding(mut self) -> Self {
        self.grounding = false;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.read().unwrap().clone()
    }
}

#[async_trait]
impl AI for MockAI {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AiError> {
        self.requests.write().unwrap().push(request);
        if let Some(message) = &self.failure {
            return Err(AiError::Api(message.clone()));
        }
        let response = GenerateResponse::new(self.response.clone());
        Ok(match self.usage {
            Some((prompt, completion)) => response.with_usage(prompt, completion),
            None => response,
        })
    }

    fn supports_grounding(&self) -> bool {
        self.grounding
    }
}

// ============================================================================
// OCR and rendering
// ============================================================================

/// Mock OCR returning the same text for every image.
#[derive(Default)]
pub struct MockOcr {
    text: String,
    confidence: f32,
    cost: Option<f64>,
    failure: Option<String>,
    calls: Arc<RwLock<usize>>,
}

impl MockOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>, confidence: f32) -> Self {
        self.text = text.into();
        self.confidence = confidence;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

#[async_trait]
impl Ocr for MockOcr {
    async fn detect_text(&self, _image: &[u8]) -> Result<OcrText, OcrError> {
        *self.calls.write().unwrap() += 1;
        if let Some(message) = &self.failure {
            return Err(OcrError::Request(message.clone()));
        }
        let found = OcrText::new(self.text.clone(), self.confidence);
        Ok(match self.cost {
            Some(cost) => found.with_cost(cost),
            None => found,
        })
    }
}

/// Mock renderer producing a tiny fake PNG per page.
#[derive(Default)]
pub struct MockRenderer {
    fail: bool,
    rendered: Arc<RwLock<Vec<u32>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Pages rendered so far, in call order.
    pub fn rendered_pages(&self) -> Vec<u32> {
        self.rendered.read().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render_page(&self, _pdf: &[u8], page: u32, _dpi: u32) -> Result<Vec<u8>, RenderError> {
        if self.fail {
            return Err(RenderError::Failed {
                page,
                reason: "mock renderer failure".to_string(),
            });
        }
        self.rendered.write().unwrap().push(page);
        Ok(b"\x89PNG mock".to_vec())
    }
}

// ============================================================================
// Fetcher
// ============================================================================

#[derive(Clone)]
enum Canned {
    Body {
        content_type: String,
        body: Vec<u8>,
    },
    Status(u16),
    Timeout,
}

/// Mock fetcher serving canned responses by exact URL.
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, Canned>,
    requested: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_body(url, "text/html; charset=utf-8", html.into().into_bytes())
    }

    pub fn with_image(self, url: impl Into<String>, content_type: &str, bytes: Vec<u8>) -> Self {
        self.with_body(url, content_type, bytes)
    }

    pub fn with_pdf(self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.with_body(url, "application/pdf", bytes)
    }

    pub fn with_body(mut self, url: impl Into<String>, content_type: &str, body: Vec<u8>) -> Self {
        self.responses.insert(
            url.into(),
            Canned::Body {
                content_type: content_type.to_string(),
                body,
            },
        );
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.responses.insert(url.into(), Canned::Status(status));
        self
    }

    pub fn with_timeout(mut self, url: impl Into<String>) -> Self {
        self.responses.insert(url.into(), Canned::Timeout);
        self
    }

    /// URLs requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.read().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str, limits: FetchLimits) -> FetchResult<FetchedResponse> {
        self.requested.write().unwrap().push(url.to_string());
        match self.responses.get(url).cloned() {
            Some(Canned::Body { content_type, body }) => {
                if body.len() > limits.max_bytes {
                    return Err(FetchError::TooLarge {
                        url: url.to_string(),
                        limit: limits.max_bytes,
                    });
                }
                Ok(FetchedResponse::new(url, body).with_content_type(content_type))
            }
            Some(Canned::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// One recorded upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

/// Mock object storage. Public URLs are `https://storage.example/{path}`.
#[derive(Default)]
pub struct MockStorage {
    fail: bool,
    uploads: Arc<RwLock<Vec<UploadRecord>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Successful uploads so far.
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.read().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str, path: &str) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Upload {
                path: path.to_string(),
                reason: "mock storage is unavailable".to_string(),
            });
        }
        self.uploads.write().unwrap().push(UploadRecord {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(format!("https://storage.example/{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limits() -> FetchLimits {
        FetchLimits::new(Duration::from_secs(1), 1024)
    }

    #[tokio::test]
    async fn test_mock_ai_records_requests() {
        let ai = MockAI::new().with_response("{}").with_usage(10, 5);
        let response = ai
            .generate(GenerateRequest::new("gemini-2.0-flash").part("hello"))
            .await
            .unwrap();

        assert_eq!(response.text, "{}");
        assert_eq!(response.usage.unwrap().prompt_tokens, 10);
        assert_eq!(ai.requests().len(), 1);
        assert_eq!(ai.requests()[0].parts, vec!["hello"]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_unknown_url_is_404() {
        let fetcher = MockFetcher::new();
        let err = fetcher.get("https://nowhere.example/", limits()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(fetcher.requested(), vec!["https://nowhere.example/"]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_enforces_size_limit() {
        let fetcher = MockFetcher::new().with_pdf("https://cdn.example/big.pdf", vec![0; 2048]);
        let err = fetcher
            .get("https://cdn.example/big.pdf", limits())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_mock_storage_records_uploads() {
        let storage = MockStorage::new();
        let url = storage.upload(vec![1, 2], "image/png", "a/b.png").await.unwrap();
        assert_eq!(url, "https://storage.example/a/b.png");
        assert_eq!(storage.uploads()[0].size, 2);
    }
}
