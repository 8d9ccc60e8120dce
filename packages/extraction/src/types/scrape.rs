//! Page scraper output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FetchError;

/// Structured data found on a vendor page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    /// The JSON-LD object chosen as the product (or the first object found)
    pub json_ld: Option<serde_json::Value>,

    /// `og:*` and `product:*` properties
    #[serde(default)]
    pub open_graph: BTreeMap<String, String>,

    /// Named `<meta>` tags (description, keywords, twitter:*)
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl StructuredData {
    pub fn is_empty(&self) -> bool {
        self.json_ld.is_none() && self.open_graph.is_empty() && self.meta.is_empty()
    }
}

/// Best-effort product data scraped from a vendor URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Minor currency units
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    /// Absolute, deduplicated, in priority order
    #[serde(default)]
    pub images: Vec<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    /// Visible page text, bounded length
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub structured: StructuredData,
    /// Set only on the degraded form produced from a failed scrape
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Degraded result carrying only the URL and the failure.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&FetchError> for ScrapeResult {
    fn from(err: &FetchError) -> Self {
        ScrapeResult::failed(err.url(), err.to_string())
    }
}

/// An image downloaded for re-upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub size: usize,
}

impl DownloadedImage {
    /// File extension matching the content type.
    pub fn extension(&self) -> &'static str {
        let ct = self.content_type.to_lowercase();
        if ct.contains("png") {
            "png"
        } else if ct.contains("webp") {
            "webp"
        } else if ct.contains("gif") {
            "gif"
        } else if ct.contains("avif") {
            "avif"
        } else if ct.contains("svg") {
            "svg"
        } else {
            "jpg"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_from_fetch_error() {
        let err = FetchError::Status {
            url: "https://vendor.example/x".to_string(),
            status: 500,
        };
        let result = ScrapeResult::from(&err);
        assert_eq!(result.url, "https://vendor.example/x");
        assert!(result.is_failed());
        assert!(result.images.is_empty());
        assert!(result.name.is_none());
    }

    #[test]
    fn test_image_extension() {
        let image = DownloadedImage {
            bytes: vec![],
            content_type: "image/png".to_string(),
            size: 0,
        };
        assert_eq!(image.extension(), "png");

        let image = DownloadedImage {
            content_type: "image/jpeg; charset=binary".to_string(),
            ..image
        };
        assert_eq!(image.extension(), "jpg");
    }
}
