//! Catalog Extraction Library
//!
//! Turns a vendor's PDF catalog, a vendor product page, and free-form
//! instructions into normalized product records, driven by a durable job.
//!
//! # Pipeline
//!
//! A queued job is claimed by [`JobProcessor`], which runs, in order:
//!
//! 1. PDF download and parsing ([`DocumentParser`]), with OCR of scanned pages
//! 2. Vendor page scraping ([`PageScraper`])
//! 3. AI extraction and normalization ([`ExtractionOrchestrator`])
//! 4. Image ingestion into object storage ([`ImageIngestion`])
//!
//! Failures in steps 1, 2 and 4 are recorded on the job and the pipeline
//! continues. A failed AI call fails the job.
//!
//! # Usage
//!
//! ```rust,ignore
//! use catalog_extraction::{JobProcessor, PipelineDeps, PipelineConfig, MemoryJobStore};
//! use catalog_extraction::testing::{MockAI, MockFetcher, MockStorage};
//!
//! let store = Arc::new(MemoryJobStore::new());
//! let deps = PipelineDeps {
//!     job_store: store.clone(),
//!     ai: Arc::new(MockAI::new()),
//!     ocr: None,
//!     storage: Arc::new(MockStorage::new()),
//!     fetcher: Arc::new(MockFetcher::new()),
//!     renderer: None,
//! };
//! let processor = JobProcessor::new(deps, PipelineConfig::default());
//!
//! let job = store.create(JobInputs::new("Extract the Aria door")).await?;
//! processor.process_job(job.id).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (AI, OCR, storage, job store)
//! - [`types`] - Jobs, pages, scrapes, products and configuration
//! - [`parser`] - PDF text extraction and scan detection
//! - [`scrape`] - Vendor page scraping
//! - [`orchestrator`] - Prompt building, tier selection, response parsing
//! - [`ingestion`] - Image re-hosting
//! - [`processor`] - The job state machine
//! - [`stores`] - In-memory job store
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod http;
pub mod ingestion;
pub mod orchestrator;
pub mod parser;
pub mod processor;
pub mod scrape;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    AiError, FetchError, OcrError, PdfError, PipelineError, RenderError, StorageError,
    StoreError,
};
pub use http::HttpFetcher;
pub use ingestion::{ImageIngestion, IngestionReport};
pub use orchestrator::{
    Enrichment, ExtractionOrchestrator, ExtractionOutcome, ExtractionRequest, Priced,
    Validation, ValidationIssue,
};
pub use parser::{parse_page_range, DocumentParser, PdftoppmRenderer};
pub use processor::{JobProcessor, PipelineDeps, ProcessOutcome};
pub use scrape::PageScraper;
pub use stores::MemoryJobStore;
pub use traits::{
    ai::{GenerateRequest, GenerateResponse, GenerationConfig, TokenUsage, AI},
    fetcher::{FetchLimits, FetchedResponse, Fetcher},
    ocr::{Ocr, OcrText},
    renderer::PageRenderer,
    storage::ObjectStorage,
    store::JobStore,
};
pub use types::{
    config::{
        ExtractionConfig, IngestionConfig, ModelTier, ParserConfig, PipelineConfig,
        ScraperConfig, TierSpec,
    },
    job::{
        CostBreakdown, Job, JobId, JobInputs, JobOptions, JobResults, JobStatus, PdfSummary,
        ProgressExtra, VendorSummary,
    },
    page::{OcrPageResult, PageExtraction, PageImages},
    product::{ExtractedProduct, Variant},
    scrape::{DownloadedImage, ScrapeResult, StructuredData},
};
