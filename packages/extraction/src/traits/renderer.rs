//! Page rasterizer trait.
//!
//! Rendering is optional: a runtime without a rasterizer simply passes no
//! renderer to the parser, and scanned pages keep their native text.

use async_trait::async_trait;

use crate::error::RenderError;

/// Renders a single PDF page to PNG bytes.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// `page` is 1-indexed.
    async fn render_page(&self, pdf: &[u8], page: u32, dpi: u32) -> Result<Vec<u8>, RenderError>;
}
