//! Extracted product records.
//!
//! These are the strongly-typed output of the extraction orchestrator. The
//! AI service's loose JSON never leaves the orchestrator; it is normalized
//! into these types first.

use serde::{Deserialize, Serialize};

/// A product extracted from a catalog page or vendor site.
///
/// All prices are integers in minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Image URLs. Rewritten in place by image ingestion.
    #[serde(default)]
    pub images: Vec<String>,
    /// 0.0 to 1.0
    pub confidence: f64,
    /// Provenance tags, e.g. "page:45" or "url:vendor.com/x"
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ExtractedProduct {
    /// Create a product with the given name and defaults everywhere else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price_cents: 0,
            category: String::new(),
            variants: Vec::new(),
            highlights: Vec::new(),
            images: Vec::new(),
            confidence: 0.8,
            sources: Vec::new(),
        }
    }

    pub fn with_price_cents(mut self, cents: i64) -> Self {
        self.price_cents = cents;
        self
    }

    pub fn with_images(mut self, images: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Whether confidence is below the given review threshold.
    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }
}

/// A purchasable variant of a product (size, finish, material).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub material: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Variant {
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            name: name.into(),
            material: None,
            price_cents,
            image_url: None,
            notes: None,
        }
    }
}
