//! OCR service trait.

use async_trait::async_trait;

use crate::error::OcrError;

/// Text recognized in one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrText {
    pub text: String,
    /// 0.0 to 1.0
    pub confidence: f32,
    /// USD charged for this call; `None` when the service doesn't say
    pub cost: Option<f64>,
}

impl OcrText {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// Optical character recognition over a rendered page image.
#[async_trait]
pub trait Ocr: Send + Sync {
    async fn detect_text(&self, image: &[u8]) -> Result<OcrText, OcrError>;
}
