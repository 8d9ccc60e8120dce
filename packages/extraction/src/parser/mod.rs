//! Document parser.
//!
//! Extracts per-page text from a catalog PDF, flags pages that look like
//! scans, and substitutes OCR text for scanned pages when a renderer and an
//! OCR service are both available.
//!
//! Structure walking happens on a blocking thread (lopdf is synchronous);
//! OCR calls run afterwards, one page at a time, so page order is preserved.

pub mod page_range;
pub mod render;

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::PdfError;
use crate::traits::ocr::Ocr;
use crate::traits::renderer::PageRenderer;
use crate::types::config::ParserConfig;
use crate::types::page::{OcrPageResult, PageExtraction, PageImages};

pub use page_range::{page_references, parse_page_range};
pub use render::PdftoppmRenderer;

/// US Letter, used when a page has no readable MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Text-show operators counted for density.
const TEXT_SHOW_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// Parent-chain depth limit when resolving inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// What the structural pass learned about one page.
#[derive(Debug, Clone)]
struct PageScan {
    page: u32,
    text: String,
    density: f64,
    image_count: usize,
}

/// PDF text extraction with optional OCR substitution.
pub struct DocumentParser {
    config: ParserConfig,
    ocr: Option<Arc<dyn Ocr>>,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl DocumentParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            ocr: None,
            renderer: None,
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn Ocr>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `pdf`, reading only `pages` (1-indexed; empty means all).
    ///
    /// Only a document that cannot be loaded at all is an error. Per-page
    /// failures become a placeholder string for that page; OCR and render
    /// failures fall back to the native text.
    pub async fn parse(
        &self,
        pdf: &[u8],
        pages: &[u32],
        ocr_enabled: bool,
    ) -> Result<PageExtraction, PdfError> {
        let bytes = pdf.to_vec();
        let requested = pages.to_vec();
        let (page_count, scans) =
            tokio::task::spawn_blocking(move || scan_document(&bytes, &requested))
                .await
                .map_err(|e| PdfError::Load(format!("parser task failed: {}", e)))??;

        let mut extraction = PageExtraction {
            page_count,
            ..Default::default()
        };

        for scan in scans {
            extraction.pages_processed.push(scan.page);
            if scan.image_count > 0 {
                extraction.page_images.push(PageImages {
                    page: scan.page,
                    count: scan.image_count,
                });
            }

            let scanned = scan.density < self.config.scanned_density_threshold;
            let mut text = scan.text;

            if scanned {
                extraction.scanned_pages.insert(scan.page);
                let short = text.trim().chars().count() < self.config.min_text_chars;
                if short && ocr_enabled {
                    if let Some(result) = self.ocr_page(pdf, scan.page).await {
                        text = result.0;
                        extraction.ocr_results.push(result.1);
                    }
                }
            }

            extraction.pages.insert(scan.page, text);
        }

        info!(
            page_count = extraction.page_count,
            pages_processed = extraction.pages_processed.len(),
            scanned = extraction.scanned_pages.len(),
            ocr_pages = extraction.ocr_results.len(),
            "PDF parsed"
        );

        Ok(extraction)
    }

    /// Render and OCR one page. `None` means "keep the native text".
    async fn ocr_page(&self, pdf: &[u8], page: u32) -> Option<(String, OcrPageResult)> {
        let (Some(ocr), Some(renderer)) = (&self.ocr, &self.renderer) else {
            debug!(page, "Scanned page but OCR or rendering unavailable");
            return None;
        };

        let image = match renderer.render_page(pdf, page, self.config.render_dpi).await {
            Ok(image) => image,
            Err(e) => {
                warn!(page, error = %e, "Page render failed, keeping native text");
                return None;
            }
        };

        match ocr.detect_text(&image).await {
            Ok(found) if !found.text.trim().is_empty() => {
                let char_count = found.text.chars().count();
                let cost = found.cost.unwrap_or(self.config.ocr_cost_per_page);
                debug!(page, char_count, confidence = found.confidence, "OCR substituted page text");
                Some((
                    found.text,
                    OcrPageResult {
                        page,
                        confidence: found.confidence,
                        char_count,
                        cost,
                    },
                ))
            }
            Ok(_) => {
                debug!(page, "OCR returned no text, keeping native text");
                None
            }
            Err(e) => {
                warn!(page, error = %e, "OCR failed, keeping native text");
                None
            }
        }
    }
}

/// Load the document and scan the selected pages.
fn scan_document(pdf: &[u8], requested: &[u32]) -> Result<(u32, Vec<PageScan>), PdfError> {
    let doc = Document::load_mem(pdf).map_err(|e| PdfError::Load(e.to_string()))?;
    let all_pages: BTreeMap<u32, ObjectId> = doc.get_pages();
    if all_pages.is_empty() {
        return Err(PdfError::Empty);
    }
    let page_count = all_pages.len() as u32;

    let wanted: BTreeSet<u32> = requested
        .iter()
        .copied()
        .filter(|p| all_pages.contains_key(p))
        .collect();
    if !requested.is_empty() && wanted.is_empty() {
        warn!(
            ?requested,
            page_count, "Requested pages are outside the document, reading all pages"
        );
    }

    let scans = all_pages
        .iter()
        .filter(|(page, _)| wanted.is_empty() || wanted.contains(page))
        .map(|(&page, &page_id)| scan_page(&doc, page, page_id))
        .collect();

    Ok((page_count, scans))
}

fn scan_page(doc: &Document, page: u32, page_id: ObjectId) -> PageScan {
    let text = match doc.extract_text(&[page]) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(page, error = %e, "Text extraction failed for page");
            format!("[Error extracting page {}: {}]", page, e)
        }
    };

    let text_ops = match doc.get_and_decode_page_content(page_id) {
        Ok(content) => content
            .operations
            .iter()
            .filter(|op| TEXT_SHOW_OPERATORS.contains(&op.operator.as_str()))
            .count(),
        Err(e) => {
            debug!(page, error = %e, "Could not decode page content");
            0
        }
    };

    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .ok();
    let area = page_dict
        .and_then(|dict| media_box(doc, dict))
        .map(|[x0, y0, x1, y1]| ((x1 - x0) * (y1 - y0)).abs())
        .filter(|area| *area > 0.0)
        .unwrap_or((DEFAULT_MEDIA_BOX[2] - DEFAULT_MEDIA_BOX[0]) * (DEFAULT_MEDIA_BOX[3] - DEFAULT_MEDIA_BOX[1]));

    let image_count = page_dict.map(|dict| count_images(doc, dict)).unwrap_or(0);

    PageScan {
        page,
        text,
        density: text_density(text_ops, area),
        image_count,
    }
}

/// Text-show operators per 10 000 pt² of page area.
pub fn text_density(text_ops: usize, area: f64) -> f64 {
    if area <= 0.0 {
        return 0.0;
    }
    text_ops as f64 / (area / 10_000.0)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up a page attribute, following `Parent` links for inherited keys.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        let parent = dict.get(b"Parent").ok().and_then(|p| resolve(doc, p))?;
        dict = parent.as_dict().ok()?;
    }
    None
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn media_box(doc: &Document, page: &Dictionary) -> Option<[f64; 4]> {
    let array = inherited(doc, page, b"MediaBox")?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, obj) in out.iter_mut().zip(array) {
        *slot = as_number(resolve(doc, obj)?)?;
    }
    Some(out)
}

fn count_images(doc: &Document, page: &Dictionary) -> usize {
    let Some(resources) = inherited(doc, page, b"Resources").and_then(|r| r.as_dict().ok()) else {
        return 0;
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
    else {
        return 0;
    };

    xobjects
        .iter()
        .filter_map(|(_, obj)| resolve(doc, obj))
        .filter(|obj| match obj {
            Object::Stream(stream) => {
                matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
            }
            _ => false,
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockOcr, MockRenderer};
    use lopdf::{dictionary, Stream};

    /// Build a PDF. `Some(n)` pages carry `n` text-show operators; `None`
    /// pages carry only an embedded image, like a scan.
    fn build_pdf(pages: &[Option<usize>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        ));

        let mut kids: Vec<Object> = Vec::new();
        for spec in pages {
            let (content, resources) = match spec {
                Some(lines) => {
                    let mut ops = String::from("BT /F1 12 Tf 50 700 Td ");
                    for i in 0..*lines {
                        ops.push_str(&format!("(Frameless shower door line {}) Tj 0 -14 Td ", i));
                    }
                    ops.push_str("ET");
                    (ops, dictionary! { "Font" => dictionary! { "F1" => font_id } })
                }
                None => (
                    "q 612 0 0 792 0 0 cm /Im1 Do Q".to_string(),
                    dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
                ),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                // Inherited by every page
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn parser_with_ocr(ocr: Arc<MockOcr>, renderer: Arc<MockRenderer>) -> DocumentParser {
        DocumentParser::new(ParserConfig::default())
            .with_ocr(ocr)
            .with_renderer(renderer)
    }

    #[test]
    fn test_text_density() {
        let letter = 612.0 * 792.0;
        assert!(text_density(1, letter) < 0.1);
        assert!(text_density(20, letter) > 0.1);
        assert_eq!(text_density(5, 0.0), 0.0);
    }

    #[tokio::test]
    async fn test_text_pages_are_not_ocred() {
        let pdf = build_pdf(&[Some(20), Some(20)]);
        let ocr = Arc::new(MockOcr::new().with_text("should not be used", 0.9));
        let renderer = Arc::new(MockRenderer::new());
        let parser = parser_with_ocr(ocr.clone(), renderer.clone());

        let result = parser.parse(&pdf, &[], true).await.unwrap();

        assert_eq!(result.page_count, 2);
        assert_eq!(result.pages_processed, vec![1, 2]);
        assert!(result.scanned_pages.is_empty());
        assert!(result.ocr_results.is_empty());
        assert!(result.text(1).unwrap().contains("Frameless shower door"));
        assert_eq!(ocr.call_count(), 0);
        assert!(renderer.rendered_pages().is_empty());
    }

    #[tokio::test]
    async fn test_scanned_page_is_replaced_by_ocr_text() {
        let pdf = build_pdf(&[Some(20), None]);
        let ocr = Arc::new(MockOcr::new().with_text("SERIES 500 SLIDING DOOR $1,295", 0.93));
        let renderer = Arc::new(MockRenderer::new());
        let parser = parser_with_ocr(ocr.clone(), renderer.clone());

        let result = parser.parse(&pdf, &[], true).await.unwrap();

        assert!(result.is_scanned(2));
        assert!(!result.is_scanned(1));
        assert_eq!(result.text(2), Some("SERIES 500 SLIDING DOOR $1,295"));
        assert_eq!(result.ocr_results.len(), 1);
        assert_eq!(result.ocr_results[0].page, 2);
        assert!((result.ocr_cost() - 0.0015).abs() < 1e-12);
        assert_eq!(renderer.rendered_pages(), vec![2]);
        assert_eq!(
            result.page_images,
            vec![PageImages { page: 2, count: 1 }]
        );
    }

    #[tokio::test]
    async fn test_ocr_disabled_keeps_native_text() {
        let pdf = build_pdf(&[None]);
        let ocr = Arc::new(MockOcr::new().with_text("ocr text", 0.9));
        let parser = parser_with_ocr(ocr.clone(), Arc::new(MockRenderer::new()));

        let result = parser.parse(&pdf, &[], false).await.unwrap();

        assert!(result.is_scanned(1));
        assert_eq!(result.text(1), Some(""));
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_renderer_is_not_fatal() {
        let pdf = build_pdf(&[None]);
        let parser = DocumentParser::new(ParserConfig::default())
            .with_ocr(Arc::new(MockOcr::new().with_text("ocr text", 0.9)));

        let result = parser.parse(&pdf, &[], true).await.unwrap();

        assert!(result.is_scanned(1));
        assert!(result.ocr_results.is_empty());
    }

    #[tokio::test]
    async fn test_ocr_failure_falls_back_to_native_text() {
        let pdf = build_pdf(&[None]);
        let parser = parser_with_ocr(
            Arc::new(MockOcr::new().failing("quota exceeded")),
            Arc::new(MockRenderer::new()),
        );

        let result = parser.parse(&pdf, &[], true).await.unwrap();

        assert!(result.ocr_results.is_empty());
        assert_eq!(result.text(1), Some(""));
    }

    #[tokio::test]
    async fn test_render_failure_falls_back_to_native_text() {
        let pdf = build_pdf(&[None]);
        let ocr = Arc::new(MockOcr::new().with_text("ocr text", 0.9));
        let parser = parser_with_ocr(ocr.clone(), Arc::new(MockRenderer::new().failing()));

        let result = parser.parse(&pdf, &[], true).await.unwrap();

        assert!(result.ocr_results.is_empty());
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn test_selected_pages_only() {
        let pdf = build_pdf(&[Some(20), Some(20), Some(20), Some(20)]);
        let parser = DocumentParser::new(ParserConfig::default());

        let result = parser.parse(&pdf, &[2, 4, 9], false).await.unwrap();

        assert_eq!(result.page_count, 4);
        assert_eq!(result.pages_processed, vec![2, 4]);
        assert!(result.text(1).is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_pages_read_whole_document() {
        let pdf = build_pdf(&[Some(20), Some(20)]);
        let parser = DocumentParser::new(ParserConfig::default());

        let result = parser.parse(&pdf, &[40], false).await.unwrap();

        assert_eq!(result.pages_processed, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_density_threshold_is_configurable() {
        let pdf = build_pdf(&[Some(2)]);
        let strict = DocumentParser::new(ParserConfig::default());
        let lenient =
            DocumentParser::new(ParserConfig::default().with_scanned_density_threshold(0.01));

        assert!(strict.parse(&pdf, &[], false).await.unwrap().is_scanned(1));
        assert!(!lenient.parse(&pdf, &[], false).await.unwrap().is_scanned(1));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_load() {
        let parser = DocumentParser::new(ParserConfig::default());
        let err = parser
            .parse(b"<html>404 Not Found</html>", &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfError::Load(_)));
    }
}
