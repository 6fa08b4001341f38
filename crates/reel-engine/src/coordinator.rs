//! Job coordination: per-project mutual exclusion, lifecycle transitions,
//! progress tracking, and cancellation.
//!
//! The coordinator is the single owner of terminal job-state transitions
//! and of the project lock table. Locks are lazy in-process mutexes keyed
//! by project ID, never persisted and never exposed to callers directly.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use reel_models::{GenerationJob, JobId, JobStatus, ProfileId, ProjectId};
use reel_store::{JobRepo, KeyValueStore};

use crate::error::{EngineError, EngineResult};
use crate::logging::JobLog;

/// Cancellation signal handed to work running under a job. Flips to true
/// when the job is cancelled or times out; work checks it at suspension
/// points.
pub type CancelSignal = watch::Receiver<bool>;

/// Held for the duration of one generation; releasing it (by drop) lets
/// the next queued request for the same project proceed.
pub struct ProjectLock {
    project_id: ProjectId,
    _guard: OwnedMutexGuard<()>,
}

impl ProjectLock {
    /// The project this lock serializes.
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }
}

/// Coordinates job lifecycle and per-project serialization.
pub struct JobCoordinator {
    repo: JobRepo,
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
    cancels: Mutex<HashMap<JobId, watch::Sender<bool>>>,
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repo: JobRepo::new(store),
            locks: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Suspend until no other generation holds this project's lock.
    /// At most one generation per project runs at a time.
    pub async fn acquire_project_lock(&self, project_id: &ProjectId) -> ProjectLock {
        let mutex = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(project_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        debug!(project_id = %project_id, "Waiting for project lock");
        let guard = mutex.lock_owned().await;
        debug!(project_id = %project_id, "Project lock acquired");

        ProjectLock {
            project_id: project_id.clone(),
            _guard: guard,
        }
    }

    /// Create and persist a pending job.
    pub async fn create_job(
        &self,
        project_id: ProjectId,
        profile_id: ProfileId,
    ) -> EngineResult<GenerationJob> {
        let job = GenerationJob::new(project_id, profile_id);
        self.repo.save(&job).await?;
        info!(job_id = %job.id, project_id = %job.project_id, "Job created");
        Ok(job)
    }

    /// Fetch a job record.
    pub async fn get_job(&self, job_id: &JobId) -> EngineResult<GenerationJob> {
        match self.repo.find(job_id).await? {
            Some(job) => Ok(job),
            None => Err(EngineError::JobNotFound(job_id.clone())),
        }
    }

    /// Update progress while the job is live. Calls against a terminal job
    /// indicate stale background work and are rejected loudly.
    pub async fn update_progress(
        &self,
        job_id: &JobId,
        percent: u8,
        message: impl Into<String>,
    ) -> EngineResult<()> {
        let job = self.get_job(job_id).await?;
        if job.status.is_terminal() {
            error!(
                job_id = %job_id,
                status = %job.status,
                "Rejected progress update on terminal job"
            );
            return Err(EngineError::JobAlreadyTerminal {
                job_id: job_id.clone(),
                status: job.status,
            });
        }

        let message = message.into();
        debug!(job_id = %job_id, percent, "{}", message);
        let updated = job
            .with_progress(percent)
            .with_data("message", serde_json::Value::String(message));
        self.repo.save(&updated).await?;
        Ok(())
    }

    /// Attach a value to a live job's data payload (warnings, result refs).
    pub async fn record_data(
        &self,
        job_id: &JobId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> EngineResult<()> {
        let job = self.get_job(job_id).await?;
        if job.status.is_terminal() {
            return Err(EngineError::JobAlreadyTerminal {
                job_id: job_id.clone(),
                status: job.status,
            });
        }
        self.repo.save(&job.with_data(key, value)).await?;
        Ok(())
    }

    /// Signal a running job to stop at its next suspension point.
    pub async fn cancel_job(&self, job_id: &JobId) {
        if let Some(sender) = self.cancels.lock().await.get(job_id) {
            info!(job_id = %job_id, "Cancellation requested");
            let _ = sender.send(true);
        }
    }

    /// Run `work` under a job: transitions to `Processing`, hands the work
    /// a cancellation signal, and maps the outcome to exactly one terminal
    /// transition. The project lock is released on every exit path:
    /// normal return, error, timeout, or cancellation.
    pub async fn run_under_job<F, Fut, T>(
        &self,
        job_id: &JobId,
        lock: ProjectLock,
        timeout: Option<Duration>,
        work: F,
    ) -> EngineResult<T>
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let log = JobLog::new(job_id, "generation");

        let job = self.get_job(job_id).await?;
        if job.status.is_terminal() {
            return Err(EngineError::JobAlreadyTerminal {
                job_id: job_id.clone(),
                status: job.status,
            });
        }
        self.repo.save(&job.start()).await?;
        log.start("processing under project lock");

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancels
            .lock()
            .await
            .insert(job_id.clone(), cancel_tx.clone());

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, work(cancel_rx)).await {
                Ok(result) => result,
                Err(_) => {
                    // Stop whatever survived the race against the clock.
                    let _ = cancel_tx.send(true);
                    Err(EngineError::Timeout(limit.as_secs()))
                }
            },
            None => work(cancel_rx).await,
        };

        self.cancels.lock().await.remove(job_id);

        let outcome = match result {
            Ok(value) => {
                let job = self.get_job(job_id).await?;
                self.repo.save(&job.complete()).await?;
                metrics::counter!("reel_jobs_completed").increment(1);
                log.completion("generation finished");
                Ok(value)
            }
            Err(e) => {
                let job = self.get_job(job_id).await?;
                self.repo
                    .save(&job.fail(e.to_string(), e.failure_cause()))
                    .await?;
                metrics::counter!("reel_jobs_failed").increment(1);
                log.failure(&e.to_string());
                Err(e)
            }
        };

        drop(lock);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_store::MemoryStore;

    fn coordinator() -> JobCoordinator {
        JobCoordinator::new(Arc::new(MemoryStore::new()))
    }

    fn project() -> ProjectId {
        ProjectId::from_string("proj_1")
    }

    fn profile() -> ProfileId {
        ProfileId::from_string("profile_1")
    }

    #[tokio::test]
    async fn run_under_job_completes_on_success() {
        let coordinator = coordinator();
        let job = coordinator.create_job(project(), profile()).await.unwrap();
        let lock = coordinator.acquire_project_lock(&project()).await;

        let value = coordinator
            .run_under_job(&job.id, lock, None, |_cancel| async { Ok(42u32) })
            .await
            .unwrap();
        assert_eq!(value, 42);

        let stored = coordinator.get_job(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress, 100);
    }

    #[tokio::test]
    async fn run_under_job_records_failure_with_cause() {
        let coordinator = coordinator();
        let job = coordinator.create_job(project(), profile()).await.unwrap();
        let lock = coordinator.acquire_project_lock(&project()).await;

        let err = coordinator
            .run_under_job(&job.id, lock, None, |_cancel| async {
                Err::<(), _>(EngineError::Cancelled)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));

        let stored = coordinator.get_job(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error.is_some());
        assert_eq!(
            stored.failure_cause,
            Some(reel_models::FailureCause::Cancelled)
        );
    }

    #[tokio::test]
    async fn timeout_fails_the_job_and_flips_the_signal() {
        let coordinator = coordinator();
        let job = coordinator.create_job(project(), profile()).await.unwrap();
        let lock = coordinator.acquire_project_lock(&project()).await;

        let err = coordinator
            .run_under_job(
                &job.id,
                lock,
                Some(Duration::from_millis(20)),
                |mut cancel| async move {
                    // Sleeps far past the timeout; the signal fires first
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(30)) => Ok(()),
                        _ = cancel.changed() => Err(EngineError::Cancelled),
                    }
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Timeout(_)));
        let stored = coordinator.get_job(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failure_cause, Some(reel_models::FailureCause::Timeout));

        // Lock was released despite the timeout
        let _relock = coordinator.acquire_project_lock(&project()).await;
    }

    #[tokio::test]
    async fn progress_after_terminal_state_is_rejected() {
        let coordinator = coordinator();
        let job = coordinator.create_job(project(), profile()).await.unwrap();
        let lock = coordinator.acquire_project_lock(&project()).await;

        coordinator
            .run_under_job(&job.id, lock, None, |_cancel| async { Ok(()) })
            .await
            .unwrap();

        let err = coordinator
            .update_progress(&job.id, 50, "stale background update")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::JobAlreadyTerminal { .. }));
    }

    #[tokio::test]
    async fn progress_updates_land_while_processing() {
        let coordinator = Arc::new(coordinator());
        let job = coordinator.create_job(project(), profile()).await.unwrap();
        let lock = coordinator.acquire_project_lock(&project()).await;

        let inner = coordinator.clone();
        let job_id = job.id.clone();
        coordinator
            .run_under_job(&job.id, lock, None, |_cancel| async move {
                inner.update_progress(&job_id, 30, "selecting segments").await?;
                let stored = inner.get_job(&job_id).await?;
                assert_eq!(stored.progress, 30);
                assert_eq!(stored.status, JobStatus::Processing);
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_job_flips_the_work_signal() {
        let coordinator = Arc::new(coordinator());
        let job = coordinator.create_job(project(), profile()).await.unwrap();
        let lock = coordinator.acquire_project_lock(&project()).await;

        let canceller = coordinator.clone();
        let job_id = job.id.clone();
        let cancel_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel_job(&job_id).await;
        });

        let err = coordinator
            .run_under_job(&job.id, lock, None, |mut cancel| async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(30)) => Ok(()),
                    _ = cancel.changed() => Err(EngineError::Cancelled),
                }
            })
            .await
            .unwrap_err();

        cancel_task.await.unwrap();
        assert!(matches!(err, EngineError::Cancelled));
        let stored = coordinator.get_job(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
    }
}
