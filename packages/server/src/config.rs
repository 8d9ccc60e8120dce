use anyhow::{Context, Result};
use catalog_extraction::ModelTier;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub gemini_api_key: String,
    /// OCR of scanned pages is disabled when absent
    pub google_vision_api_key: Option<String>,
    pub storage_url: String,
    pub storage_service_key: String,
    pub storage_bucket: String,
    pub admin_api_token: String,
    pub internal_call_secret: String,
    pub extraction_model_tier: Option<ModelTier>,
    pub scanned_density_threshold: Option<f64>,
    pub worker_poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            gemini_api_key: env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?,
            google_vision_api_key: optional("GOOGLE_VISION_API_KEY"),
            storage_url: env::var("STORAGE_URL").context("STORAGE_URL must be set")?,
            storage_service_key: env::var("STORAGE_SERVICE_KEY")
                .context("STORAGE_SERVICE_KEY must be set")?,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "product-images".to_string()),
            admin_api_token: env::var("ADMIN_API_TOKEN")
                .context("ADMIN_API_TOKEN must be set")?,
            internal_call_secret: env::var("INTERNAL_CALL_SECRET")
                .context("INTERNAL_CALL_SECRET must be set")?,
            extraction_model_tier: optional("EXTRACTION_MODEL_TIER")
                .map(|tier| tier.parse::<ModelTier>())
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("EXTRACTION_MODEL_TIER must be fast or capable")?,
            scanned_density_threshold: optional("SCANNED_DENSITY_THRESHOLD")
                .map(|v| v.parse::<f64>())
                .transpose()
                .context("SCANNED_DENSITY_THRESHOLD must be a number")?,
            worker_poll_interval: Duration::from_secs(
                env::var("WORKER_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("WORKER_POLL_INTERVAL_SECS must be a whole number")?,
            ),
        })
    }
}

/// Unset and blank variables are both treated as absent.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
