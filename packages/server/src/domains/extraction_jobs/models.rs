//! Row model for the `extraction_jobs` table.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use catalog_extraction::{
    CostBreakdown, Job, JobInputs, JobOptions, JobResults, JobStatus, StoreError,
};

/// Columns selected by every job query, in [`ExtractionJobRow`] order.
pub const JOB_COLUMNS: &str = "id, status, progress, message, pdf_url, vendor_url, instructions, \
     options, results, errors, total_cost, cost_breakdown, created_at, started_at, completed_at";

#[derive(FromRow, Debug, Clone)]
pub struct ExtractionJobRow {
    pub id: Uuid,
    pub status: String,
    pub progress: i16,
    pub message: Option<String>,
    pub pdf_url: Option<String>,
    pub vendor_url: Option<String>,
    pub instructions: String,
    pub options: Json<JobOptions>,
    pub results: Option<Json<JobResults>>,
    pub errors: Json<Vec<String>>,
    pub total_cost: f64,
    pub cost_breakdown: Json<CostBreakdown>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExtractionJobRow> for Job {
    type Error = StoreError;

    fn try_from(row: ExtractionJobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(|reason| StoreError::Corrupt {
            id: row.id,
            reason,
        })?;
        let progress = u8::try_from(row.progress).map_err(|_| StoreError::Corrupt {
            id: row.id,
            reason: format!("progress {} out of range", row.progress),
        })?;

        Ok(Job {
            id: row.id,
            inputs: JobInputs {
                pdf_url: row.pdf_url,
                vendor_url: row.vendor_url,
                instructions: row.instructions,
                options: row.options.0,
            },
            status,
            progress,
            message: row.message,
            results: row.results.map(|r| r.0),
            errors: row.errors.0,
            total_cost: row.total_cost,
            cost_breakdown: row.cost_breakdown.0,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}
