//! Typed job persistence over the key/value store.

use std::sync::Arc;

use reel_models::{GenerationJob, JobId, ProjectId};

use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;

const JOB_PREFIX: &str = "jobs/";

/// Repository for generation job records.
#[derive(Clone)]
pub struct JobRepo {
    store: Arc<dyn KeyValueStore>,
}

impl JobRepo {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(job_id: &JobId) -> String {
        format!("{JOB_PREFIX}{job_id}")
    }

    /// Insert or replace a job record.
    pub async fn save(&self, job: &GenerationJob) -> StoreResult<()> {
        let value = serde_json::to_value(job)?;
        self.store.put(&Self::key(&job.id), value).await
    }

    /// Fetch a job by ID.
    pub async fn find(&self, job_id: &JobId) -> StoreResult<Option<GenerationJob>> {
        match self.store.get(&Self::key(job_id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Fetch a job by ID, failing when absent.
    pub async fn get(&self, job_id: &JobId) -> StoreResult<GenerationJob> {
        self.find(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))
    }

    /// All jobs recorded for a project, oldest first.
    pub async fn for_project(&self, project_id: &ProjectId) -> StoreResult<Vec<GenerationJob>> {
        let rows = self.store.query(JOB_PREFIX).await?;
        let mut jobs: Vec<GenerationJob> = rows
            .into_iter()
            .filter_map(|(_, value)| serde_json::from_value::<GenerationJob>(value).ok())
            .filter(|job| job.project_id == *project_id)
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}
