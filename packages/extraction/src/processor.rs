//! Job processor.
//!
//! Drives one job through `queued -> processing -> {completed, failed}`:
//! PDF download and parse, vendor scrape, AI extraction, image ingestion,
//! then a single terminal write. Each stage owns its soft failures (they go
//! into the job's error list); anything returned as `Err` from a stage fails
//! the job with the error list preserved.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, Result};
use crate::ingestion::ImageIngestion;
use crate::orchestrator::{ExtractionOrchestrator, ExtractionRequest};
use crate::parser::{page_references, DocumentParser};
use crate::scrape::PageScraper;
use crate::traits::ai::AI;
use crate::traits::fetcher::{FetchLimits, Fetcher};
use crate::traits::ocr::Ocr;
use crate::traits::renderer::PageRenderer;
use crate::traits::storage::ObjectStorage;
use crate::traits::store::JobStore;
use crate::types::config::PipelineConfig;
use crate::types::job::{
    CostBreakdown, Job, JobId, JobResults, JobStatus, PdfSummary, ProgressExtra, VendorSummary,
};
use crate::types::page::PageExtraction;
use crate::types::scrape::ScrapeResult;

/// External collaborators injected into the processor.
#[derive(Clone)]
pub struct PipelineDeps {
    pub job_store: Arc<dyn JobStore>,
    pub ai: Arc<dyn AI>,
    /// `None` disables OCR of scanned pages
    pub ocr: Option<Arc<dyn Ocr>>,
    pub storage: Arc<dyn ObjectStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    /// `None` when no rasterizer is installed
    pub renderer: Option<Arc<dyn PageRenderer>>,
}

/// How a `process_job` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessOutcome {
    Completed,
    Failed,
    /// Job was not `queued` (already claimed or finished)
    Skipped,
}

/// Mutable state of one run, kept outside the stage sequence so the
/// failure path can still write what was collected.
#[derive(Debug, Default)]
struct RunState {
    progress: u8,
    errors: Vec<String>,
    costs: CostBreakdown,
}

impl RunState {
    fn soft_error(&mut self, job_id: JobId, message: String) {
        warn!(job_id = %job_id, error = %message, "Soft failure");
        self.errors.push(message);
    }
}

/// Top-level coordinator for extraction jobs.
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    fetcher: Arc<dyn Fetcher>,
    parser: DocumentParser,
    scraper: Arc<PageScraper>,
    orchestrator: ExtractionOrchestrator,
    ingestion: ImageIngestion,
    config: PipelineConfig,
}

impl JobProcessor {
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        let mut parser = DocumentParser::new(config.parser.clone());
        if let Some(ocr) = deps.ocr {
            parser = parser.with_ocr(ocr);
        }
        if let Some(renderer) = deps.renderer {
            parser = parser.with_renderer(renderer);
        }

        let scraper = Arc::new(PageScraper::new(deps.fetcher.clone(), config.scraper.clone()));
        let orchestrator = ExtractionOrchestrator::new(deps.ai, config.extraction.clone());
        let ingestion = ImageIngestion::new(
            scraper.clone(),
            deps.storage,
            config.ingestion.clone(),
        );

        Self {
            store: deps.job_store,
            fetcher: deps.fetcher,
            parser,
            scraper,
            orchestrator,
            ingestion,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Process the oldest queued job, if any. At most one job per call.
    pub async fn drain_one(&self) -> Result<Option<(JobId, ProcessOutcome)>> {
        let Some(job) = self.store.find_oldest_queued().await? else {
            debug!("No queued jobs");
            return Ok(None);
        };
        let outcome = self.process_job(job.id).await?;
        Ok(Some((job.id, outcome)))
    }

    /// Run the pipeline for one job.
    ///
    /// Returns `Skipped` without touching the job unless it is `queued`.
    /// `Err` only when the job does not exist or the store itself fails while
    /// recording the outcome.
    pub async fn process_job(&self, job_id: JobId) -> Result<ProcessOutcome> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or(PipelineError::JobNotFound(job_id))?;

        if job.status != JobStatus::Queued {
            info!(job_id = %job_id, status = %job.status, "Job is not queued, skipping");
            return Ok(ProcessOutcome::Skipped);
        }
        if !self.store.mark_processing(job_id).await? {
            info!(job_id = %job_id, "Job was claimed by another worker, skipping");
            return Ok(ProcessOutcome::Skipped);
        }

        info!(
            job_id = %job_id,
            has_pdf = job.inputs.pdf_url().is_some(),
            has_vendor = job.inputs.vendor_url().is_some(),
            "Processing extraction job"
        );

        let mut state = RunState::default();
        match self.run(&job, &mut state).await {
            Ok(results) => {
                let total = state.costs.total();
                self.store
                    .mark_completed(job_id, &results, state.costs, total)
                    .await?;
                info!(
                    job_id = %job_id,
                    products = results.products.len(),
                    errors = state.errors.len(),
                    total_cost = total,
                    "Job completed"
                );
                Ok(ProcessOutcome::Completed)
            }
            Err(e) => {
                let message = e.to_string();
                error!(job_id = %job_id, error = %message, "Job failed");
                self.store
                    .mark_failed(job_id, &message, &state.errors)
                    .await?;
                Ok(ProcessOutcome::Failed)
            }
        }
    }

    async fn progress(
        &self,
        job_id: JobId,
        state: &mut RunState,
        progress: u8,
        message: &str,
    ) -> Result<()> {
        state.progress = state.progress.max(progress);
        let extra = ProgressExtra::none()
            .with_errors(&state.errors)
            .with_costs(state.costs);
        self.store
            .update_progress(job_id, state.progress, message, extra)
            .await?;
        Ok(())
    }

    async fn run(&self, job: &Job, state: &mut RunState) -> Result<JobResults> {
        let started = Instant::now();
        let inputs = &job.inputs;

        self.progress(job.id, state, 5, "Starting extraction").await?;

        let pages = match inputs.pdf_url() {
            Some(url) => self.pdf_stage(job, url, state).await?,
            None => None,
        };

        let scrape = match inputs.vendor_url() {
            Some(url) => Some(self.vendor_stage(job, url, state).await?),
            None => None,
        };
        let scrapes: Vec<ScrapeResult> = scrape.iter().filter(|s| !s.is_failed()).cloned().collect();

        if pages.is_none() && scrapes.is_empty() && !inputs.has_instructions() {
            return Err(PipelineError::NoInput);
        }

        self.progress(job.id, state, 50, "Extracting products").await?;
        let request = ExtractionRequest::new(&inputs.instructions, &inputs.options)
            .with_pages(pages.as_ref())
            .with_scrapes(&scrapes);
        let outcome = self.orchestrator.extract(request).await?;
        state.costs = state.costs.add_extraction(outcome.cost);
        state.errors.extend(outcome.errors);
        self.progress(
            job.id,
            state,
            75,
            &format!("Extracted {} products", outcome.products.len()),
        )
        .await?;

        let mut products = outcome.products;
        let has_images = products.iter().any(|p| !p.images.is_empty());
        if inputs.options.fetch_images && has_images {
            self.progress(job.id, state, 80, "Ingesting product images").await?;
            let report = self.ingestion.ingest(job.id, &mut products).await;
            state.costs = state.costs.add_storage(report.cost);
            for message in report.errors {
                state.soft_error(job.id, message);
            }
        }

        self.progress(job.id, state, 95, "Saving results").await?;

        Ok(JobResults {
            products,
            errors: state.errors.clone(),
            suggestions: outcome.suggestions,
            model_tier: outcome.model_tier,
            model_used: outcome.model_used,
            execution_time_ms: started.elapsed().as_millis() as u64,
            pdf: pages.as_ref().map(PdfSummary::from),
            vendor: scrape.as_ref().map(VendorSummary::from),
        })
    }

    /// Download and parse the catalog. Download and parse failures are soft.
    async fn pdf_stage(
        &self,
        job: &Job,
        url: &str,
        state: &mut RunState,
    ) -> Result<Option<PageExtraction>> {
        self.progress(job.id, state, 10, "Downloading PDF").await?;

        let limits = FetchLimits::new(
            self.config.pdf_download.timeout,
            self.config.pdf_download.max_bytes,
        );
        let pdf = match self.fetcher.get(url, limits).await {
            Ok(response) => response.body,
            Err(e) => {
                state.soft_error(job.id, format!("PDF download failed: {}", e));
                self.progress(job.id, state, 35, "PDF unavailable, continuing").await?;
                return Ok(None);
            }
        };

        let pages = page_references(&job.inputs.instructions);
        self.progress(
            job.id,
            state,
            25,
            &if pages.is_empty() {
                "Parsing PDF".to_string()
            } else {
                format!("Parsing {} PDF pages", pages.len())
            },
        )
        .await?;

        let parsed = match self.parser.parse(&pdf, &pages, true).await {
            Ok(parsed) => {
                state.costs = state.costs.add_vision(parsed.ocr_cost());
                Some(parsed)
            }
            Err(e) => {
                state.soft_error(job.id, format!("PDF parsing failed: {}", e));
                None
            }
        };

        self.progress(job.id, state, 35, "PDF processed").await?;
        Ok(parsed)
    }

    /// Scrape the vendor page. Returns the degraded result on failure so the
    /// results summary can show what went wrong.
    async fn vendor_stage(&self, job: &Job, url: &str, state: &mut RunState) -> Result<ScrapeResult> {
        self.progress(job.id, state, 45, "Scraping vendor page").await?;

        let result = self.scraper.scrape_or_degraded(url).await;
        if let Some(error) = &result.error {
            state.soft_error(job.id, format!("Vendor scrape failed: {}", error));
        }
        Ok(result)
    }
}
