//! Configuration types for parsing, scraping, extraction and ingestion.
//!
//! Every tunable threshold lives here with its default so deployments can
//! override them without touching pipeline code.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named configuration of the AI extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap, fast model for small single-product jobs
    Fast,
    /// Larger context, higher accuracy, roughly 10x the price
    Capable,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Capable => write!(f, "capable"),
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "flash" => Ok(ModelTier::Fast),
            "capable" | "pro" => Ok(ModelTier::Capable),
            other => Err(format!("Invalid model tier: {}", other)),
        }
    }
}

/// Model id and pricing for one tier. Prices are USD per million tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSpec {
    pub model: String,
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
}

impl TierSpec {
    pub fn new(
        model: impl Into<String>,
        input_price_per_million: f64,
        output_price_per_million: f64,
    ) -> Self {
        Self {
            model: model.into(),
            input_price_per_million,
            output_price_per_million,
        }
    }

    /// Cost in USD of a call that used the given token counts.
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.input_price_per_million
            + completion_tokens as f64 * self.output_price_per_million)
            / 1_000_000.0
    }
}

/// Configuration for the document parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Text-show operators per 10 000 pt² of page area below which a page is
    /// treated as a likely scan.
    ///
    /// Uncalibrated heuristic; tune per catalog source. Default: 0.1.
    pub scanned_density_threshold: f64,

    /// Native text shorter than this (in chars) on a scanned page triggers
    /// OCR. Default: 50.
    pub min_text_chars: usize,

    /// Render resolution for OCR. Default: 200.
    pub render_dpi: u32,

    /// Fallback per-page OCR cost when the OCR service reports none.
    pub ocr_cost_per_page: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            scanned_density_threshold: 0.1,
            min_text_chars: 50,
            render_dpi: 200,
            ocr_cost_per_page: 0.0015,
        }
    }
}

impl ParserConfig {
    pub fn with_scanned_density_threshold(mut self, threshold: f64) -> Self {
        self.scanned_density_threshold = threshold;
        self
    }

    pub fn with_min_text_chars(mut self, chars: usize) -> Self {
        self.min_text_chars = chars;
        self
    }
}

/// Configuration for the page scraper and image downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Per-page fetch timeout. Default: 15s.
    pub timeout: Duration,

    /// Upper bound on `raw_text` length (chars). Default: 10 000.
    pub max_raw_text_chars: usize,

    /// Maximum image URLs returned per page. Default: 10.
    pub max_images: usize,

    /// Stop scanning product-image selectors once this many are found.
    /// Default: 5.
    pub selector_image_target: usize,

    /// Declared width/height below which an `<img>` is ignored. Default: 100.
    pub min_image_dimension: u32,

    /// Concurrent fetches per batch. Default: 3.
    pub batch_size: usize,

    /// Pause between batches. Default: 1s.
    pub batch_delay: Duration,

    /// Image download timeout. Default: 15s.
    pub image_timeout: Duration,

    /// Maximum image size in bytes. Default: 10 MiB.
    pub max_image_bytes: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_raw_text_chars: 10_000,
            max_images: 10,
            selector_image_target: 5,
            min_image_dimension: 100,
            batch_size: 3,
            batch_delay: Duration::from_millis(1000),
            image_timeout: Duration::from_secs(15),
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ScraperConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }
}

/// Configuration for the extraction orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Cheap tier (small jobs)
    pub fast: TierSpec,

    /// Capable tier (large or multi-product jobs)
    pub capable: TierSpec,

    /// Skip tier selection and always use this tier.
    pub forced_tier: Option<ModelTier>,

    /// Content above this many chars selects the capable tier. Default: 20 000.
    pub large_content_threshold: usize,

    /// More products than this selects the capable tier. Default: 5.
    pub many_products_threshold: usize,

    /// Per-page text cap in the prompt (chars). Default: 6 000.
    pub page_text_cap: usize,

    /// Per-site raw text cap in the prompt (chars). Default: 3 000.
    pub vendor_text_cap: usize,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Output token ceiling. Default: 8 192.
    pub max_output_tokens: u32,

    /// Request search grounding when the service supports it. Default: true.
    pub grounding: bool,

    /// Products below this confidence produce a review suggestion. Default: 0.8.
    pub low_confidence_threshold: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fast: TierSpec::new("gemini-2.0-flash", 0.10, 0.40),
            capable: TierSpec::new("gemini-2.5-pro", 1.25, 10.00),
            forced_tier: None,
            large_content_threshold: 20_000,
            many_products_threshold: 5,
            page_text_cap: 6_000,
            vendor_text_cap: 3_000,
            temperature: 0.1,
            max_output_tokens: 8_192,
            grounding: true,
            low_confidence_threshold: 0.8,
        }
    }
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always use the given tier regardless of content size.
    pub fn with_forced_tier(mut self, tier: ModelTier) -> Self {
        self.forced_tier = Some(tier);
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    /// Tier spec for a tier.
    pub fn tier(&self, tier: ModelTier) -> &TierSpec {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Capable => &self.capable,
        }
    }
}

/// Configuration for image ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Images downloaded and re-uploaded per product. Default: 3.
    pub max_images_per_product: usize,

    /// Estimated storage cost per uploaded image (USD). Default: 0.0001.
    pub storage_cost_per_image: f64,

    /// Path prefix for uploaded objects.
    pub path_prefix: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_images_per_product: 3,
            storage_cost_per_image: 0.0001,
            path_prefix: "extraction-jobs".to_string(),
        }
    }
}

/// Configuration for the whole job pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub parser: ParserConfig,
    pub scraper: ScraperConfig,
    pub extraction: ExtractionConfig,
    pub ingestion: IngestionConfig,

    pub pdf_download: PdfDownloadLimits,
}

/// Limits applied to the catalog PDF download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDownloadLimits {
    /// Default: 60s.
    pub timeout: Duration,
    /// Default: 50 MiB.
    pub max_bytes: usize,
}

impl Default for PdfDownloadLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_scraper(mut self, scraper: ScraperConfig) -> Self {
        self.scraper = scraper;
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    pub fn with_ingestion(mut self, ingestion: IngestionConfig) -> Self {
        self.ingestion = ingestion;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_cost() {
        let spec = TierSpec::new("m", 0.10, 0.40);
        let cost = spec.cost(1_000_000, 500_000);
        assert!((cost - 0.30).abs() < 1e-9);
        assert_eq!(spec.cost(0, 0), 0.0);
    }

    #[test]
    fn test_model_tier_parse() {
        assert_eq!("fast".parse::<ModelTier>().unwrap(), ModelTier::Fast);
        assert_eq!("Pro".parse::<ModelTier>().unwrap(), ModelTier::Capable);
        assert!("turbo".parse::<ModelTier>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.scraper.batch_size, 3);
        assert_eq!(config.ingestion.max_images_per_product, 3);
        assert_eq!(config.extraction.low_confidence_threshold, 0.8);
        assert!(config.extraction.forced_tier.is_none());
    }
}
