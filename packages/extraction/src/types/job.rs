//! Extraction job model.
//!
//! A job is the only persisted entity in the pipeline. Inputs are fixed once
//! queued; lifecycle fields are written by the job processor only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::ModelTier;
use super::page::PageExtraction;
use super::product::ExtractedProduct;
use super::scrape::ScrapeResult;

pub type JobId = Uuid;

// ============================================================================
// Status
// ============================================================================

/// Job lifecycle: `queued -> processing -> {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

fn default_true() -> bool {
    true
}

/// Caller options for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Pin every extracted product to this category
    #[serde(default)]
    pub target_category: Option<String>,

    /// Ask for long-form marketing descriptions
    #[serde(default)]
    pub generate_descriptions: bool,

    /// Download and re-host product images
    #[serde(default = "default_true")]
    pub fetch_images: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            target_category: None,
            generate_descriptions: false,
            fetch_images: true,
        }
    }
}

/// Immutable inputs of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInputs {
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub vendor_url: Option<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub options: JobOptions,
}

impl JobInputs {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Default::default()
        }
    }

    pub fn with_pdf_url(mut self, url: impl Into<String>) -> Self {
        self.pdf_url = Some(url.into());
        self
    }

    pub fn with_vendor_url(mut self, url: impl Into<String>) -> Self {
        self.vendor_url = Some(url.into());
        self
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn vendor_url(&self) -> Option<&str> {
        self.vendor_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    pub fn has_instructions(&self) -> bool {
        !self.instructions.trim().is_empty()
    }

    /// At least one of PDF, vendor URL or instructions is present.
    pub fn has_any_input(&self) -> bool {
        self.pdf_url().is_some() || self.vendor_url().is_some() || self.has_instructions()
    }
}

// ============================================================================
// Cost accounting
// ============================================================================

/// Per-stage cost in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// AI extraction calls
    pub extraction: f64,
    /// OCR of scanned pages
    #[serde(alias = "ocr")]
    pub vision: f64,
    /// Image uploads
    pub storage: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.extraction + self.vision + self.storage
    }

    pub fn add_extraction(mut self, cost: f64) -> Self {
        self.extraction += cost;
        self
    }

    pub fn add_vision(mut self, cost: f64) -> Self {
        self.vision += cost;
        self
    }

    pub fn add_storage(mut self, cost: f64) -> Self {
        self.storage += cost;
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// Summary of the parsed PDF stored with the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfSummary {
    pub page_count: u32,
    pub pages_processed: Vec<u32>,
    pub scanned_pages: Vec<u32>,
    pub ocr_pages: Vec<u32>,
    pub pages_with_images: Vec<u32>,
}

impl From<&PageExtraction> for PdfSummary {
    fn from(pages: &PageExtraction) -> Self {
        Self {
            page_count: pages.page_count,
            pages_processed: pages.pages_processed.clone(),
            scanned_pages: pages.scanned_pages.iter().copied().collect(),
            ocr_pages: pages.ocr_results.iter().map(|r| r.page).collect(),
            pages_with_images: pages.page_images.iter().map(|p| p.page).collect(),
        }
    }
}

/// Summary of the vendor scrape stored with the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub url: String,
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub image_count: usize,
    pub error: Option<String>,
}

impl From<&ScrapeResult> for VendorSummary {
    fn from(scrape: &ScrapeResult) -> Self {
        Self {
            url: scrape.url.clone(),
            name: scrape.name.clone(),
            price_cents: scrape.price_cents,
            image_count: scrape.images.len(),
            error: scrape.error.clone(),
        }
    }
}

/// Final payload written with the `completed` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResults {
    pub products: Vec<ExtractedProduct>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub model_tier: ModelTier,
    pub model_used: String,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub pdf: Option<PdfSummary>,
    #[serde(default)]
    pub vendor: Option<VendorSummary>,
}

// ============================================================================
// Job
// ============================================================================

/// A persisted extraction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub inputs: JobInputs,
    pub status: JobStatus,
    /// 0-100, never decreases within a run
    pub progress: u8,
    pub message: Option<String>,
    pub results: Option<JobResults>,
    /// Non-fatal errors in the order they happened
    #[serde(default)]
    pub errors: Vec<String>,
    pub total_cost: f64,
    pub cost_breakdown: CostBreakdown,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly queued job.
    pub fn queued(inputs: JobInputs) -> Self {
        Self {
            id: Uuid::now_v7(),
            inputs,
            status: JobStatus::Queued,
            progress: 0,
            message: Some("Queued".to_string()),
            results: None,
            errors: Vec::new(),
            total_cost: 0.0,
            cost_breakdown: CostBreakdown::default(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Optional fields written alongside a progress update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressExtra {
    pub errors: Option<Vec<String>>,
    pub cost_breakdown: Option<CostBreakdown>,
}

impl ProgressExtra {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_errors(mut self, errors: &[String]) -> Self {
        self.errors = Some(errors.to_vec());
        self
    }

    pub fn with_costs(mut self, costs: CostBreakdown) -> Self {
        self.cost_breakdown = Some(costs);
        self
    }
}
