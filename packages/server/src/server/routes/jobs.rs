//! Extraction job routes: create, read, and the processing trigger.

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use catalog_extraction::{Job, JobInputs, JobStatus, ProcessOutcome};

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Body of the trigger route; an empty body drains one queued job.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    #[serde(default, alias = "jobId")]
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    /// `true` when the job was handed to a background task
    pub accepted: bool,
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProcessOutcome>,
    pub message: String,
}

/// Queue a new job. At least one of `pdf_url`, `vendor_url` or
/// `instructions` must be present.
pub async fn create_job(
    Extension(state): Extension<AppState>,
    Json(inputs): Json<JobInputs>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    if !inputs.has_any_input() {
        return Err(ApiError::BadRequest(
            "one of pdf_url, vendor_url or instructions is required".to_string(),
        ));
    }

    let job = state.job_store.create(inputs).await?;
    info!(job_id = %job.id, "Extraction job created");
    Ok((StatusCode::CREATED, Json(job)))
}

/// Current status, progress and results of a job.
pub async fn get_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    state
        .job_store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {} not found", id)))
}

/// Start a specific job in the background, or drain the oldest queued job
/// inline when no id is given.
pub async fn trigger_processing(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerRequest::default()
    } else {
        serde_json::from_slice::<TriggerRequest>(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid trigger body: {}", e)))?
    };

    match request.job_id {
        Some(job_id) => {
            let job = state
                .job_store
                .get(job_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("job {} not found", job_id)))?;
            if job.status != JobStatus::Queued {
                return Ok((
                    StatusCode::OK,
                    Json(TriggerResponse {
                        accepted: false,
                        job_id: Some(job_id),
                        outcome: Some(ProcessOutcome::Skipped),
                        message: format!("Job is already {}", job.status),
                    }),
                ));
            }

            let processor = state.processor.clone();
            tokio::spawn(async move {
                if let Err(e) = processor.process_job(job_id).await {
                    error!(job_id = %job_id, error = %e, "Background job processing failed");
                }
            });

            info!(job_id = %job_id, "Job processing started");
            Ok((
                StatusCode::ACCEPTED,
                Json(TriggerResponse {
                    accepted: true,
                    job_id: Some(job_id),
                    outcome: None,
                    message: "Processing started".to_string(),
                }),
            ))
        }
        None => {
            let drained = state.processor.drain_one().await?;
            let response = match drained {
                Some((job_id, outcome)) => TriggerResponse {
                    accepted: false,
                    job_id: Some(job_id),
                    outcome: Some(outcome),
                    message: format!("Processed job {}", job_id),
                },
                None => TriggerResponse {
                    accepted: false,
                    job_id: None,
                    outcome: None,
                    message: "No queued jobs".to_string(),
                },
            };
            Ok((StatusCode::OK, Json(response)))
        }
    }
}
