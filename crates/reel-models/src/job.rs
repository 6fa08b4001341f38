//! Generation job lifecycle records.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the project a generation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the tenant profile a generation runs under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl ProfileId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, not yet picked up.
    #[default]
    Pending,
    /// Job is running under the coordinator.
    Processing,
    /// Job finished successfully (possibly with warnings in `data`).
    Completed,
    /// Job finished with an error.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// True once no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable category for a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// Caller-supplied input could not be processed.
    InvalidInput,
    /// The media toolkit rejected or failed on the source.
    MediaFailure,
    /// Narration synthesis failed with no fallback configured.
    SynthesisFailure,
    /// The job exceeded its wall-clock timeout.
    Timeout,
    /// The job was cancelled before completing.
    Cancelled,
    /// Anything else.
    Internal,
}

/// Lifecycle record for one generation request.
///
/// Created by the coordinator at request time and mutated only through its
/// update API; terminal once `Completed` or `Failed`. Retention and cleanup
/// belong to the surrounding platform, never to this core.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationJob {
    /// Unique job ID.
    pub id: JobId,

    /// Project this generation belongs to.
    pub project_id: ProjectId,

    /// Tenant profile the generation runs under.
    pub profile_id: ProfileId,

    /// Lifecycle state.
    #[serde(default)]
    pub status: JobStatus,

    /// Progress in percent, 0-100.
    #[serde(default)]
    pub progress: u8,

    /// Free-form payload: progress messages, warnings, result references.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// Human-readable error message, set when `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable failure category, set when `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_cause: Option<FailureCause>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Create a new pending job.
    pub fn new(project_id: ProjectId, profile_id: ProfileId) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            project_id,
            profile_id,
            status: JobStatus::Pending,
            progress: 0,
            data: HashMap::new(),
            error: None,
            failure_cause: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to `Processing`.
    pub fn start(mut self) -> Self {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
        self
    }

    /// Transition to `Completed` at 100% progress.
    pub fn complete(mut self) -> Self {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.updated_at = Utc::now();
        self
    }

    /// Transition to `Failed` with a message and cause category.
    pub fn fail(mut self, error: impl Into<String>, cause: FailureCause) -> Self {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.failure_cause = Some(cause);
        self.updated_at = Utc::now();
        self
    }

    /// Update progress, clamped to 100.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
        self
    }

    /// Insert a value into the data payload.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self.updated_at = Utc::now();
        self
    }
}
