//! In-process router over the in-memory store and mocked collaborators.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use catalog_extraction::testing::{MockAI, MockFetcher, MockRenderer, MockStorage};
use catalog_extraction::{JobProcessor, MemoryJobStore, PipelineConfig, PipelineDeps};
use server_core::server::middleware::TriggerAuth;
use server_core::server::{build_app, AppState};

pub const INTERNAL_SECRET: &str = "internal-test-secret";
pub const ADMIN_TOKEN: &str = "admin-test-token";

pub const ONE_PRODUCT: &str = r#"{"products":[{"name":"Aria Frameless Door","price":630,"confidence":0.92}],"suggestions":[]}"#;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryJobStore>,
    pub ai: Arc<MockAI>,
}

impl TestApp {
    pub fn new(ai: MockAI) -> Self {
        Self::with_fetcher(ai, MockFetcher::new())
    }

    pub fn with_fetcher(ai: MockAI, fetcher: MockFetcher) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = Arc::new(MemoryJobStore::new());
        let ai = Arc::new(ai);
        let deps = PipelineDeps {
            job_store: store.clone(),
            ai: ai.clone(),
            ocr: None,
            storage: Arc::new(MockStorage::new()),
            fetcher: Arc::new(fetcher),
            renderer: Some(Arc::new(MockRenderer::new())),
        };
        let processor = Arc::new(JobProcessor::new(deps, PipelineConfig::default()));
        let router = build_app(
            AppState::new(processor),
            TriggerAuth::new(INTERNAL_SECRET, ADMIN_TOKEN),
        );

        Self { router, store, ai }
    }

    /// Send one request and decode the JSON body (`Value::Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body collects");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Trigger call carrying the internal-call header.
    pub async fn trigger(&self, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::post("/api/extraction-jobs/process")
            .header("x-internal-call", INTERNAL_SECRET)
            .header("content-type", "application/json");
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        self.send(builder.body(body).unwrap()).await
    }
}
