//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! soft failure (record it, keep going) from a fatal one (fail the job).

use thiserror::Error;

/// Top-level pipeline errors. Anything that reaches the job processor as a
/// `PipelineError` is fatal for the job being processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Job store read/write failed
    #[error("job store error: {0}")]
    Store(#[from] StoreError),

    /// AI extraction service failed (transport, quota, refusal)
    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    /// Job has no PDF, no vendor URL and no instructions
    #[error("nothing to extract: job has no PDF, no vendor URL and no instructions")]
    NoInput,

    /// Job id does not exist
    #[error("job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// AI response could not be interpreted at all (auxiliary calls only)
    #[error("malformed AI response: {0}")]
    MalformedResponse(String),
}

/// Errors from fetching a URL (PDF, vendor page, image).
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or has an unsupported scheme
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Request did not complete within the allowed time
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Connection, TLS or body read failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Body exceeded the configured size cap
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    /// Expected an image but got something else
    #[error("{url} is not an image (content-type: {content_type})")]
    NotAnImage { url: String, content_type: String },
}

impl FetchError {
    /// The URL this error refers to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url }
            | FetchError::Timeout { url }
            | FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::TooLarge { url, .. }
            | FetchError::NotAnImage { url, .. } => url,
        }
    }
}

/// Errors from reading a PDF document.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The document could not be loaded at all
    #[error("failed to load PDF: {0}")]
    Load(String),

    /// Document loaded but has no pages
    #[error("PDF has no pages")]
    Empty,
}

/// Errors from rasterizing a PDF page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No rasterizer available in this runtime
    #[error("page rendering unavailable")]
    Unavailable,

    /// The rasterizer ran but failed
    #[error("failed to render page {page}: {reason}")]
    Failed { page: u32, reason: String },
}

/// Errors from the AI extraction service.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network failure talking to the service
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response, quota exhaustion, safety block
    #[error("API error: {0}")]
    Api(String),

    /// Response envelope could not be decoded
    #[error("response decode error: {0}")]
    Decode(String),
}

/// Errors from the OCR service.
#[derive(Debug, Error)]
pub enum OcrError {
    /// OCR is not configured
    #[error("OCR service unavailable")]
    Unavailable,

    /// OCR request failed
    #[error("OCR request failed: {0}")]
    Request(String),
}

/// Errors from object storage uploads.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload was rejected or failed in transit
    #[error("upload to {path} failed: {reason}")]
    Upload { path: String, reason: String },
}

/// Errors from the durable job store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unavailable or query failed
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored row could not be decoded into a job
    #[error("corrupt job record {id}: {reason}")]
    Corrupt { id: uuid::Uuid, reason: String },

    /// Terminal write attempted on a job that is not `processing`
    #[error("job {id} is {status}, expected processing")]
    InvalidTransition { id: uuid::Uuid, status: String },

    /// Job id does not exist
    #[error("job {0} does not exist")]
    Missing(uuid::Uuid),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for job store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
