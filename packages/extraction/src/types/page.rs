//! Document parser output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-page text extracted from a PDF, with OCR substitutions applied.
///
/// Immutable once produced; only read by the prompt builder and the job
/// results summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageExtraction {
    /// Total pages in the document
    pub page_count: u32,

    /// Pages actually read, ascending
    pub pages_processed: Vec<u32>,

    /// 1-indexed page number -> text. Ordered so prompt assembly stays
    /// page-ordered.
    pub pages: BTreeMap<u32, String>,

    /// Pages whose text density suggests a scan
    pub scanned_pages: BTreeSet<u32>,

    /// Pages whose text came from OCR
    pub ocr_results: Vec<OcrPageResult>,

    /// Pages containing embedded raster images
    pub page_images: Vec<PageImages>,
}

impl PageExtraction {
    /// Total OCR cost incurred while parsing.
    pub fn ocr_cost(&self) -> f64 {
        self.ocr_results.iter().map(|r| r.cost).sum()
    }

    /// Sum of page text lengths in chars.
    pub fn total_chars(&self) -> usize {
        self.pages.values().map(|t| t.chars().count()).sum()
    }

    /// Text for a page, if it was processed.
    pub fn text(&self, page: u32) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    pub fn is_scanned(&self, page: u32) -> bool {
        self.scanned_pages.contains(&page)
    }
}

/// OCR outcome for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPageResult {
    pub page: u32,
    pub confidence: f32,
    pub char_count: usize,
    pub cost: f64,
}

/// Embedded image metadata for one page (no image bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImages {
    pub page: u32,
    pub count: usize,
}
