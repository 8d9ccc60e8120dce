//! End-to-end tests for the job pipeline.
//!
//! Each test queues a job in the in-memory store, runs it through
//! `JobProcessor` with mocked collaborators, and checks the persisted job.

use std::sync::Arc;

use catalog_extraction::testing::{MockAI, MockFetcher, MockOcr, MockRenderer, MockStorage};
use catalog_extraction::{
    JobInputs, JobProcessor, JobStatus, JobStore, MemoryJobStore, Ocr, PipelineConfig, PipelineDeps,
    ProcessOutcome,
};
use lopdf::{dictionary, Document, Object, Stream};

const VENDOR_URL: &str = "https://acme.example/doors/aria";

const VENDOR_PAGE: &str = r#"<html><head>
<script type="application/ld+json">
{"@context":"https://schema.org","@type":"Product","name":"Aria Frameless Door",
 "image":["https://cdn.acme.example/aria-1.jpg","https://cdn.acme.example/aria-2.jpg"],
 "offers":{"@type":"Offer","price":"630.00","priceCurrency":"USD"}}
</script></head>
<body><h1>Aria Frameless Door</h1><p>3/8 in tempered glass.</p></body></html>"#;

const ONE_PRODUCT: &str = r#"```json
{"products":[{"name":"Acme 2024 Shower Door","price":630,"confidence":0.9}],"suggestions":[]}
```"#;

struct Harness {
    store: Arc<MemoryJobStore>,
    ai: Arc<MockAI>,
    storage: Arc<MockStorage>,
    processor: JobProcessor,
}

fn harness(ai: MockAI, fetcher: MockFetcher, ocr: Option<Arc<MockOcr>>) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let store = Arc::new(MemoryJobStore::new());
    let ai = Arc::new(ai);
    let storage = Arc::new(MockStorage::new());
    let deps = PipelineDeps {
        job_store: store.clone(),
        ai: ai.clone(),
        ocr: ocr.map(|o| o as Arc<dyn Ocr>),
        storage: storage.clone(),
        fetcher: Arc::new(fetcher),
        renderer: Some(Arc::new(MockRenderer::new())),
    };
    Harness {
        store,
        ai,
        storage,
        processor: JobProcessor::new(deps, PipelineConfig::default()),
    }
}

/// A catalog whose page 1 is text and page 2 is an image-only scan.
fn catalog_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
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

    let mut text = String::from("BT /F1 12 Tf 50 700 Td ");
    for i in 0..30 {
        text.push_str(&format!("(Series 300 bypass door, finish option {}) Tj 0 -14 Td ", i));
    }
    text.push_str("ET");

    let text_content = doc.add_object(Stream::new(dictionary! {}, text.into_bytes()));
    let scan_content = doc.add_object(Stream::new(
        dictionary! {},
        b"q 612 0 0 792 0 0 cm /Im1 Do Q".to_vec(),
    ));
    let text_page = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "Contents" => text_content,
    });
    let scan_page = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
        "Contents" => scan_content,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![text_page.into(), scan_page.into()],
            "Count" => 2,
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

#[tokio::test]
async fn test_instructions_only_job_completes() {
    let h = harness(
        MockAI::new().with_response(ONE_PRODUCT),
        MockFetcher::new(),
        None,
    );
    let job = h
        .store
        .create(JobInputs::new("Extract the Acme 2024 shower door"))
        .await
        .unwrap();

    let outcome = h.processor.process_job(job.id).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Completed);
    let job = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.errors.is_empty());
    assert_eq!(job.cost_breakdown.vision, 0.0);

    let results = job.results.unwrap();
    assert_eq!(results.products.len(), 1);
    assert_eq!(results.products[0].price_cents, 63_000);
    assert!(results.pdf.is_none());
    assert!(results.vendor.is_none());

    assert_eq!(h.ai.requests().len(), 1);
}

#[tokio::test]
async fn test_missing_pdf_falls_back_to_vendor_page() {
    let fetcher = MockFetcher::new()
        .with_status("https://cdn.acme.example/catalog.pdf", 404)
        .with_html(VENDOR_URL, VENDOR_PAGE)
        .with_image("https://cdn.acme.example/aria-1.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
        .with_image("https://cdn.acme.example/aria-2.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
    let ai = MockAI::new().with_response(
        r#"{"products":[{"name":"Aria Frameless Door","price_cents":63000,
            "images":["https://cdn.acme.example/aria-1.jpg","https://cdn.acme.example/aria-2.jpg"]}]}"#,
    );
    let h = harness(ai, fetcher, None);
    let job = h
        .store
        .create(
            JobInputs::default()
                .with_pdf_url("https://cdn.acme.example/catalog.pdf")
                .with_vendor_url(VENDOR_URL),
        )
        .await
        .unwrap();

    let outcome = h.processor.process_job(job.id).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Completed);
    let job = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.errors.len(), 1);
    assert!(job.errors[0].starts_with("PDF download failed"));

    // Prompt carries the vendor page only
    let prompt = h.ai.requests()[0].parts.join("\n");
    assert!(prompt.contains("Aria Frameless Door"));
    assert!(!prompt.contains("## Catalog pages"));

    let results = job.results.unwrap();
    assert!(results.pdf.is_none());
    let vendor = results.vendor.unwrap();
    assert_eq!(vendor.price_cents, Some(63_000));
    assert_eq!(vendor.image_count, 2);

    // Both images re-hosted
    assert_eq!(h.storage.uploads().len(), 2);
    assert!(results.products[0]
        .images
        .iter()
        .all(|url| url.starts_with("https://storage.example/")));
    assert!((job.cost_breakdown.storage - 0.0002).abs() < 1e-12);
}

#[tokio::test]
async fn test_scanned_catalog_page_is_ocred() {
    let pdf_url = "https://cdn.acme.example/catalog.pdf";
    let fetcher = MockFetcher::new().with_pdf(pdf_url, catalog_pdf());
    let ocr = Arc::new(MockOcr::new().with_text("SERIES 500 SLIDING DOOR $1,295", 0.92));
    let h = harness(
        MockAI::new().with_response(ONE_PRODUCT),
        fetcher,
        Some(ocr.clone()),
    );
    let job = h
        .store
        .create(JobInputs::new("Extract the sliding doors").with_pdf_url(pdf_url))
        .await
        .unwrap();

    h.processor.process_job(job.id).await.unwrap();

    let job = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(ocr.call_count(), 1);
    assert!((job.cost_breakdown.vision - 0.0015).abs() < 1e-12);

    let pdf = job.results.unwrap().pdf.unwrap();
    assert_eq!(pdf.page_count, 2);
    assert_eq!(pdf.pages_processed, vec![1, 2]);
    assert_eq!(pdf.scanned_pages, vec![2]);
    assert_eq!(pdf.ocr_pages, vec![2]);

    let prompt = h.ai.requests()[0].parts.join("\n");
    assert!(prompt.contains("Series 300 bypass door"));
    assert!(prompt.contains("SERIES 500 SLIDING DOOR"));
}

#[tokio::test]
async fn test_page_references_limit_parsing() {
    let pdf_url = "https://cdn.acme.example/catalog.pdf";
    let fetcher = MockFetcher::new().with_pdf(pdf_url, catalog_pdf());
    let ocr = Arc::new(MockOcr::new().with_text("scan text", 0.9));
    let h = harness(
        MockAI::new().with_response(ONE_PRODUCT),
        fetcher,
        Some(ocr.clone()),
    );
    let job = h
        .store
        .create(JobInputs::new("Only the door on page 1").with_pdf_url(pdf_url))
        .await
        .unwrap();

    h.processor.process_job(job.id).await.unwrap();

    let job = h.store.get(job.id).await.unwrap().unwrap();
    let pdf = job.results.unwrap().pdf.unwrap();
    assert_eq!(pdf.pages_processed, vec![1]);
    assert_eq!(ocr.call_count(), 0);
    assert_eq!(job.cost_breakdown.vision, 0.0);
}

#[tokio::test]
async fn test_corrupt_pdf_is_soft() {
    let pdf_url = "https://cdn.acme.example/broken.pdf";
    let fetcher = MockFetcher::new().with_pdf(pdf_url, b"%PDF-1.4 this is not a pdf".to_vec());
    let h = harness(MockAI::new().with_response(ONE_PRODUCT), fetcher, None);
    let job = h
        .store
        .create(JobInputs::new("Extract the door").with_pdf_url(pdf_url))
        .await
        .unwrap();

    let outcome = h.processor.process_job(job.id).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Completed);
    let job = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.errors.len(), 1);
    assert!(job.errors[0].starts_with("PDF parsing failed"));
}

#[tokio::test]
async fn test_drain_processes_oldest_first_then_stops() {
    let h = harness(
        MockAI::new().with_response(ONE_PRODUCT),
        MockFetcher::new(),
        None,
    );
    let first = h.store.create(JobInputs::new("first")).await.unwrap();
    let second = h.store.create(JobInputs::new("second")).await.unwrap();

    let (id, outcome) = h.processor.drain_one().await.unwrap().unwrap();
    assert_eq!(id, first.id);
    assert_eq!(outcome, ProcessOutcome::Completed);

    let (id, _) = h.processor.drain_one().await.unwrap().unwrap();
    assert_eq!(id, second.id);

    assert!(h.processor.drain_one().await.unwrap().is_none());

    // A finished job is never re-run
    let outcome = h.processor.process_job(first.id).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Skipped);
    assert_eq!(h.ai.requests().len(), 2);
}
