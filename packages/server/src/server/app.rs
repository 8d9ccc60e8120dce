//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use catalog_extraction::{JobProcessor, JobStore};

use crate::server::middleware::{require_internal_or_admin, TriggerAuth, INTERNAL_CALL_HEADER};
use crate::server::routes::{create_job, get_job, health_handler, trigger_processing};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub job_store: Arc<dyn JobStore>,
    pub processor: Arc<JobProcessor>,
    /// `None` when running over an in-memory store
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(processor: Arc<JobProcessor>) -> Self {
        Self {
            job_store: processor.store().clone(),
            processor,
            db_pool: None,
        }
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}

/// Build the Axum application router
///
/// Job creation and status reads are open; the trigger route requires the
/// internal-call header or the admin bearer token.
pub fn build_app(state: AppState, auth: TriggerAuth) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(INTERNAL_CALL_HEADER),
        ]);

    let trigger = post(trigger_processing).route_layer(middleware::from_fn_with_state(
        Arc::new(auth),
        require_internal_or_admin,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/extraction-jobs", post(create_job))
        .route("/api/extraction-jobs/process", trigger)
        .route("/api/extraction-jobs/:id", get(get_job))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
