//! Google Cloud Vision OCR adapter.

use async_trait::async_trait;
use base64::Engine;
use catalog_extraction::{Ocr, OcrError, OcrText};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// `DOCUMENT_TEXT_DETECTION` over the Vision REST API.
#[derive(Clone)]
pub struct VisionOcr {
    client: Client,
    api_key: String,
    endpoint: String,
    cost_per_image: f64,
}

impl VisionOcr {
    pub fn new(api_key: impl Into<String>, cost_per_image: f64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            endpoint: VISION_ENDPOINT.to_string(),
            cost_per_image,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    #[serde(default)]
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    error: Option<StatusMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<PageConfidence>,
}

#[derive(Debug, Default, Deserialize)]
struct PageConfidence {
    #[serde(default)]
    confidence: f32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct StatusMessage {
    #[serde(default)]
    message: String,
}

/// Text and mean page confidence from one annotate result.
fn read_result(result: AnnotateResult) -> Result<(String, f32), OcrError> {
    if let Some(error) = result.error {
        return Err(OcrError::Request(error.message));
    }
    let Some(annotation) = result.full_text_annotation else {
        // No text found on the image
        return Ok((String::new(), 0.0));
    };
    let confidence = if annotation.pages.is_empty() {
        0.0
    } else {
        annotation.pages.iter().map(|p| p.confidence).sum::<f32>() / annotation.pages.len() as f32
    };
    Ok((annotation.text, confidence))
}

#[async_trait]
impl Ocr for VisionOcr {
    async fn detect_text(&self, image: &[u8]) -> Result<OcrText, OcrError> {
        let body = json!({
            "requests": [{
                "image": { "content": base64::engine::general_purpose::STANDARD.encode(image) },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }]
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Vision request failed");
                OcrError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Vision API error");
            return Err(OcrError::Request(format!("HTTP {}: {}", status, error_text)));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Request(format!("invalid Vision response: {}", e)))?;
        let result = parsed.responses.into_iter().next().unwrap_or_default();
        let (text, confidence) = read_result(result)?;

        debug!(chars = text.len(), confidence, bytes = image.len(), "Vision OCR");
        Ok(OcrText::new(text, confidence).with_cost(self.cost_per_image))
    }
}
