//! In-memory job store for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::traits::store::JobStore;
use crate::types::job::{
    CostBreakdown, Job, JobId, JobInputs, JobResults, JobStatus, ProgressExtra,
};

struct Entry {
    /// Insertion order, for oldest-first draining
    seq: u64,
    job: Job,
    /// Every progress value written, in order
    progress_log: Vec<u8>,
}

/// In-memory job store.
///
/// Not suitable for production: jobs are lost on restart and the claim is
/// only atomic within one process.
#[derive(Default)]
pub struct MemoryJobStore {
    entries: RwLock<HashMap<JobId, Entry>>,
    next_seq: RwLock<u64>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job as-is (any status). Useful for seeding tests.
    pub fn insert(&self, job: Job) -> StoreResult<()> {
        let seq = self.bump_seq()?;
        self.write()?.insert(
            job.id,
            Entry {
                seq,
                job,
                progress_log: Vec::new(),
            },
        );
        Ok(())
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Progress values written for a job, in write order.
    pub fn progress_history(&self, id: JobId) -> Vec<u8> {
        self.entries
            .read()
            .ok()
            .and_then(|e| e.get(&id).map(|entry| entry.progress_log.clone()))
            .unwrap_or_default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<JobId, Entry>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Backend(e.to_string().into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<JobId, Entry>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string().into()))
    }

    fn bump_seq(&self) -> StoreResult<u64> {
        let mut seq = self
            .next_seq
            .write()
            .map_err(|e| StoreError::Backend(e.to_string().into()))?;
        *seq += 1;
        Ok(*seq)
    }

    /// Apply a terminal write to a `processing` job.
    fn finish(&self, id: JobId, apply: impl FnOnce(&mut Job)) -> StoreResult<()> {
        let mut entries = self.write()?;
        let entry = entries.get_mut(&id).ok_or(StoreError::Missing(id))?;
        if entry.job.status != JobStatus::Processing {
            return Err(StoreError::InvalidTransition {
                id,
                status: entry.job.status.to_string(),
            });
        }
        apply(&mut entry.job);
        entry.job.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, inputs: JobInputs) -> StoreResult<Job> {
        let job = Job::queued(inputs);
        self.insert(job.clone())?;
        Ok(job)
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        Ok(self.read()?.get(&id).map(|entry| entry.job.clone()))
    }

    async fn update_progress(
        &self,
        id: JobId,
        progress: u8,
        message: &str,
        extra: ProgressExtra,
    ) -> StoreResult<()> {
        let mut entries = self.write()?;
        let entry = entries.get_mut(&id).ok_or(StoreError::Missing(id))?;
        let progress = progress.min(100);
        entry.job.progress = progress;
        entry.job.message = Some(message.to_string());
        if let Some(errors) = extra.errors {
            entry.job.errors = errors;
        }
        if let Some(costs) = extra.cost_breakdown {
            entry.job.cost_breakdown = costs;
            entry.job.total_cost = costs.total();
        }
        entry.progress_log.push(progress);
        Ok(())
    }

    async fn mark_processing(&self, id: JobId) -> StoreResult<bool> {
        let mut entries = self.write()?;
        match entries.get_mut(&id) {
            Some(entry) if entry.job.status == JobStatus::Queued => {
                entry.job.status = JobStatus::Processing;
                entry.job.started_at = Some(Utc::now());
                entry.job.message = Some("Processing".to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_completed(
        &self,
        id: JobId,
        results: &JobResults,
        cost_breakdown: CostBreakdown,
        total_cost: f64,
    ) -> StoreResult<()> {
        self.finish(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.message = Some(format!(
                "Completed: {} products extracted",
                results.products.len()
            ));
            job.errors = results.errors.clone();
            job.results = Some(results.clone());
            job.cost_breakdown = cost_breakdown;
            job.total_cost = total_cost;
        })?;
        self.write()?
            .get_mut(&id)
            .map(|entry| entry.progress_log.push(100));
        Ok(())
    }

    async fn mark_failed(&self, id: JobId, message: &str, errors: &[String]) -> StoreResult<()> {
        self.finish(id, |job| {
            job.status = JobStatus::Failed;
            job.message = Some(message.to_string());
            job.errors = errors.to_vec();
        })
    }

    async fn find_oldest_queued(&self) -> StoreResult<Option<Job>> {
        Ok(self
            .read()?
            .values()
            .filter(|entry| entry.job.status == JobStatus::Queued)
            .min_by_key(|entry| (entry.job.created_at, entry.seq))
            .map(|entry| entry.job.clone()))
    }
}
