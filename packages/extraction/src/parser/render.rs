//! Poppler-based page renderer.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::traits::renderer::PageRenderer;

/// Renders pages by shelling out to `pdftoppm` (poppler-utils).
pub struct PdftoppmRenderer {
    binary: PathBuf,
}

impl PdftoppmRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Probe for `pdftoppm` on `PATH`. `None` when it isn't installed, in
    /// which case scanned pages keep their native text.
    pub async fn detect() -> Option<Self> {
        match Command::new("pdftoppm").arg("-v").output().await {
            Ok(_) => {
                info!("pdftoppm available, scanned-page OCR enabled");
                Some(Self::new("pdftoppm"))
            }
            Err(e) => {
                warn!(error = %e, "pdftoppm not found, scanned pages will not be rendered");
                None
            }
        }
    }

    async fn render_to_file(
        &self,
        pdf_path: &Path,
        output_prefix: &Path,
        page: u32,
        dpi: u32,
    ) -> Result<Vec<u8>, RenderError> {
        let failed = |reason: String| RenderError::Failed { page, reason };

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-singlefile")
            .args(["-r", &dpi.to_string()])
            .args(["-f", &page.to_string(), "-l", &page.to_string()])
            .arg(pdf_path)
            .arg(output_prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| failed(format!("failed to run pdftoppm: {}", e)))?;

        if !output.status.success() {
            return Err(failed(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // -singlefile writes exactly `<prefix>.png`
        let image_path = output_prefix.with_extension("png");
        let bytes = tokio::fs::read(&image_path)
            .await
            .map_err(|e| failed(format!("failed to read rendered image: {}", e)))?;
        let _ = tokio::fs::remove_file(&image_path).await;

        Ok(bytes)
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render_page(&self, pdf: &[u8], page: u32, dpi: u32) -> Result<Vec<u8>, RenderError> {
        let temp_dir = std::env::temp_dir();
        let token = uuid::Uuid::new_v4();
        let pdf_path = temp_dir.join(format!("catalog_render_{}.pdf", token));
        let output_prefix = temp_dir.join(format!("catalog_page_{}", token));

        tokio::fs::write(&pdf_path, pdf)
            .await
            .map_err(|e| RenderError::Failed {
                page,
                reason: format!("failed to write temp PDF: {}", e),
            })?;

        debug!(page, dpi, "Rendering page with pdftoppm");
        let result = self.render_to_file(&pdf_path, &output_prefix, page, dpi).await;

        let _ = tokio::fs::remove_file(&pdf_path).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_a_render_failure() {
        let renderer = PdftoppmRenderer::new("/nonexistent/pdftoppm");
        let err = renderer.render_page(b"%PDF-1.5", 1, 200).await.unwrap_err();
        assert!(matches!(err, RenderError::Failed { page: 1, .. }));
    }
}
