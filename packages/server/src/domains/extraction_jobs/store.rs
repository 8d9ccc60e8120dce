//! PostgreSQL-backed job store.
//!
//! The `queued -> processing` claim is a single conditional UPDATE, so two
//! workers racing for the same job can never both win. Terminal writes are
//! guarded the same way on `status = 'processing'`.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;

use catalog_extraction::{
    CostBreakdown, Job, JobId, JobInputs, JobResults, JobStore, ProgressExtra, StoreError,
};

use super::models::{ExtractionJobRow, JOB_COLUMNS};

type StoreResult<T> = Result<T, StoreError>;

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

/// PostgreSQL job store over the `extraction_jobs` table.
#[derive(Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find(&self, id: JobId) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, ExtractionJobRow>(&format!(
            "SELECT {} FROM extraction_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Job::try_from).transpose()
    }

    /// Explain why a guarded terminal write touched no row.
    async fn rejected_transition(&self, id: JobId) -> StoreError {
        match self.find(id).await {
            Ok(Some(job)) => StoreError::InvalidTransition {
                id,
                status: job.status.to_string(),
            },
            Ok(None) => StoreError::Missing(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, inputs: JobInputs) -> StoreResult<Job> {
        let job = Job::queued(inputs);

        let row = sqlx::query_as::<_, ExtractionJobRow>(&format!(
            r#"
            INSERT INTO extraction_jobs
                (id, status, progress, message, pdf_url, vendor_url, instructions, options, created_at)
            VALUES ($1, 'queued', 0, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job.id)
        .bind(&job.message)
        .bind(&job.inputs.pdf_url)
        .bind(&job.inputs.vendor_url)
        .bind(&job.inputs.instructions)
        .bind(Json(&job.inputs.options))
        .bind(job.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        debug!(job_id = %job.id, "Extraction job queued");
        Job::try_from(row)
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        self.find(id).await
    }

    async fn update_progress(
        &self,
        id: JobId,
        progress: u8,
        message: &str,
        extra: ProgressExtra,
    ) -> StoreResult<()> {
        let total = extra.cost_breakdown.map(|c| c.total());
        let result = sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET progress = $2,
                message = $3,
                errors = COALESCE($4, errors),
                cost_breakdown = COALESCE($5, cost_breakdown),
                total_cost = COALESCE($6, total_cost),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(i16::from(progress.min(100)))
        .bind(message)
        .bind(extra.errors.map(Json))
        .bind(extra.cost_breakdown.map(Json))
        .bind(total)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn mark_processing(&self, id: JobId) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = 'processing',
                message = 'Processing',
                started_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'queued'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_completed(
        &self,
        id: JobId,
        results: &JobResults,
        cost_breakdown: CostBreakdown,
        total_cost: f64,
    ) -> StoreResult<()> {
        let message = format!("Completed: {} products extracted", results.products.len());
        let result = sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = 'completed',
                progress = 100,
                message = $2,
                results = $3,
                errors = $4,
                cost_breakdown = $5,
                total_cost = $6,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(Json(results))
        .bind(Json(&results.errors))
        .bind(Json(cost_breakdown))
        .bind(total_cost)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_transition(id).await);
        }
        Ok(())
    }

    async fn mark_failed(&self, id: JobId, message: &str, errors: &[String]) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = 'failed',
                message = $2,
                errors = $3,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(Json(errors))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_transition(id).await);
        }
        Ok(())
    }

    async fn find_oldest_queued(&self) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, ExtractionJobRow>(&format!(
            r#"
            SELECT {}
            FROM extraction_jobs
            WHERE status = 'queued'
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
            JOB_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Job::try_from).transpose()
    }
}

/// Row count by status, for health reporting.
pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM extraction_jobs GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await
}
