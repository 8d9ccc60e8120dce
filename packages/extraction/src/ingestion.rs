//! Image ingestion.
//!
//! Copies each product's first few images into durable storage and rewrites
//! the product's `images` in place. A slot whose download or upload fails
//! keeps its original URL.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::scrape::PageScraper;
use crate::traits::storage::ObjectStorage;
use crate::types::config::IngestionConfig;
use crate::types::job::JobId;
use crate::types::product::ExtractedProduct;

/// What one ingestion pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    /// Images now served from storage
    pub uploaded: usize,
    /// Slots that kept their original URL
    pub failed: usize,
    /// Estimated storage cost (USD)
    pub cost: f64,
    /// One message per failed slot
    pub errors: Vec<String>,
}

pub struct ImageIngestion {
    downloader: Arc<PageScraper>,
    storage: Arc<dyn ObjectStorage>,
    config: IngestionConfig,
}

impl ImageIngestion {
    pub fn new(
        downloader: Arc<PageScraper>,
        storage: Arc<dyn ObjectStorage>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            downloader,
            storage,
            config,
        }
    }

    /// Object path for image `image_idx` of product `product_idx`.
    pub fn object_path(&self, job_id: JobId, product_idx: usize, image_idx: usize, ext: &str) -> String {
        format!(
            "{}/{}/{}-{}.{}",
            self.config.path_prefix, job_id, product_idx, image_idx, ext
        )
    }

    /// Ingest images for every product. Never fails; per-image problems are
    /// in the report.
    pub async fn ingest(&self, job_id: JobId, products: &mut [ExtractedProduct]) -> IngestionReport {
        let mut report = IngestionReport::default();

        for (product_idx, product) in products.iter_mut().enumerate() {
            // Only the processed slots remain on the product
            product.images.truncate(self.config.max_images_per_product);

            for (image_idx, slot) in product.images.iter_mut().enumerate() {
                let original = slot.clone();
                match self.copy_one(job_id, product_idx, image_idx, &original).await {
                    Ok(durable) => {
                        debug!(job_id = %job_id, from = %original, to = %durable, "Image ingested");
                        *slot = durable;
                        report.uploaded += 1;
                        report.cost += self.config.storage_cost_per_image;
                    }
                    Err(message) => {
                        warn!(job_id = %job_id, url = %original, error = %message, "Image ingestion failed, keeping original URL");
                        report.failed += 1;
                        report
                            .errors
                            .push(format!("Image {} for \"{}\": {}", original, product.name, message));
                    }
                }
            }
        }

        info!(
            job_id = %job_id,
            uploaded = report.uploaded,
            failed = report.failed,
            cost = report.cost,
            "Image ingestion finished"
        );
        report
    }

    async fn copy_one(
        &self,
        job_id: JobId,
        product_idx: usize,
        image_idx: usize,
        url: &str,
    ) -> Result<String, String> {
        let image = self
            .downloader
            .download_image(url)
            .await
            .map_err(|e| e.to_string())?;
        let path = self.object_path(job_id, product_idx, image_idx, image.extension());
        self.storage
            .upload(image.bytes, &image.content_type, &path)
            .await
            .map_err(|e| e.to_string())
    }
}
