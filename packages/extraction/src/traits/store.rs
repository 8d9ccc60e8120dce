//! Job store trait.
//!
//! The job row is the only shared mutable resource in the pipeline. Workers
//! coordinate exclusively through its `status` column: `mark_processing` is
//! the claim, and it must be atomic so two workers never run the same job.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::job::{CostBreakdown, Job, JobId, JobInputs, JobResults, ProgressExtra};

/// Durable storage for extraction jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `queued` job.
    async fn create(&self, inputs: JobInputs) -> StoreResult<Job>;

    /// Read a job by id.
    async fn get(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// Write progress and a human-readable message, plus optional error list
    /// and cost breakdown snapshots.
    async fn update_progress(
        &self,
        id: JobId,
        progress: u8,
        message: &str,
        extra: ProgressExtra,
    ) -> StoreResult<()>;

    /// Transition `queued -> processing` and stamp `started_at`.
    ///
    /// Returns `false` (and changes nothing) when the job is not `queued`.
    async fn mark_processing(&self, id: JobId) -> StoreResult<bool>;

    /// Write results, costs and the `completed` status in one update.
    async fn mark_completed(
        &self,
        id: JobId,
        results: &JobResults,
        cost_breakdown: CostBreakdown,
        total_cost: f64,
    ) -> StoreResult<()>;

    /// Write the fatal message, accumulated errors and the `failed` status.
    async fn mark_failed(&self, id: JobId, message: &str, errors: &[String]) -> StoreResult<()>;

    /// Oldest job still `queued`, if any.
    async fn find_oldest_queued(&self) -> StoreResult<Option<Job>>;
}
