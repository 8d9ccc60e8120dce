//! Wires the concrete adapters into the extraction pipeline.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use catalog_extraction::{
    HttpFetcher, JobProcessor, JobStore, Ocr, PageRenderer, PdftoppmRenderer, PipelineConfig,
    PipelineDeps,
};

use crate::config::Config;
use crate::kernel::{GeminiAI, SupabaseStorage, VisionOcr};

/// Pipeline tunables derived from the environment.
pub fn pipeline_config(config: &Config) -> PipelineConfig {
    let mut pipeline = PipelineConfig::default();

    if let Some(threshold) = config.scanned_density_threshold {
        pipeline.parser = pipeline
            .parser
            .clone()
            .with_scanned_density_threshold(threshold);
    }
    if let Some(tier) = config.extraction_model_tier {
        pipeline.extraction = pipeline.extraction.clone().with_forced_tier(tier);
    }

    pipeline
}

/// Build the processor with production adapters around `job_store`.
pub async fn build_processor(
    config: &Config,
    job_store: Arc<dyn JobStore>,
) -> Result<JobProcessor> {
    let pipeline = pipeline_config(config);

    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;

    let ocr: Option<Arc<dyn Ocr>> = match &config.google_vision_api_key {
        Some(key) => Some(Arc::new(VisionOcr::new(
            key.clone(),
            pipeline.parser.ocr_cost_per_page,
        ))),
        None => {
            warn!("GOOGLE_VISION_API_KEY not set, scanned pages will keep native text");
            None
        }
    };

    let renderer: Option<Arc<dyn PageRenderer>> = match PdftoppmRenderer::detect().await {
        Some(renderer) => Some(Arc::new(renderer)),
        None => {
            warn!("pdftoppm not found, page rasterization disabled");
            None
        }
    };

    info!(
        ocr = ocr.is_some(),
        renderer = renderer.is_some(),
        forced_tier = ?config.extraction_model_tier,
        "Extraction pipeline configured"
    );

    let deps = PipelineDeps {
        job_store,
        ai: Arc::new(GeminiAI::from_api_key(config.gemini_api_key.clone())),
        ocr,
        storage: Arc::new(SupabaseStorage::new(
            config.storage_url.clone(),
            config.storage_service_key.clone(),
            config.storage_bucket.clone(),
        )),
        fetcher: Arc::new(fetcher),
        renderer,
    };

    Ok(JobProcessor::new(deps, pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_extraction::ModelTier;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/catalog".to_string(),
            port: 8080,
            gemini_api_key: "key".to_string(),
            google_vision_api_key: None,
            storage_url: "https://storage.example".to_string(),
            storage_service_key: "service".to_string(),
            storage_bucket: "product-images".to_string(),
            admin_api_token: "admin".to_string(),
            internal_call_secret: "internal".to_string(),
            extraction_model_tier: None,
            scanned_density_threshold: None,
            worker_poll_interval: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_defaults_pass_through() {
        let pipeline = pipeline_config(&config());
        let defaults = PipelineConfig::default();
        assert_eq!(
            pipeline.parser.scanned_density_threshold,
            defaults.parser.scanned_density_threshold
        );
        assert!(pipeline.extraction.forced_tier.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = config();
        config.scanned_density_threshold = Some(0.25);
        config.extraction_model_tier = Some(ModelTier::Capable);

        let pipeline = pipeline_config(&config);
        assert_eq!(pipeline.parser.scanned_density_threshold, 0.25);
        assert_eq!(pipeline.extraction.forced_tier, Some(ModelTier::Capable));
    }
}
