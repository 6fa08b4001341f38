//! Structured job logging.

use tracing::{error, info, warn};

use reel_models::JobId;

/// Logger carrying job context into every event.
#[derive(Debug, Clone)]
pub struct JobLog {
    job_id: String,
    operation: String,
}

impl JobLog {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn start(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "Job started: {}", message);
    }

    pub fn progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "Job progress: {}", message);
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = %self.operation, "Job warning: {}", message);
    }

    pub fn failure(&self, message: &str) {
        error!(job_id = %self.job_id, operation = %self.operation, "Job failed: {}", message);
    }

    pub fn completion(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "Job completed: {}", message);
    }
}
