//! Engine error types.

use thiserror::Error;

use reel_analysis::AnalysisError;
use reel_media::MediaError;
use reel_models::{FailureCause, JobId, JobStatus};
use reel_narrate::SynthesisError;
use reel_store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by job coordination and assembly.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("job {job_id} is already terminal ({status})")]
    JobAlreadyTerminal { job_id: JobId, status: JobStatus },

    #[error("job timed out after {0} seconds")]
    Timeout(u64),

    #[error("job cancelled")]
    Cancelled,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("narration synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Machine-readable category recorded on a failed job.
    pub fn failure_cause(&self) -> FailureCause {
        match self {
            EngineError::Media(
                MediaError::DecodeFailed { .. }
                | MediaError::EmptyVideo { .. }
                | MediaError::FileNotFound(_)
                | MediaError::NoVideoStream(_),
            ) => FailureCause::InvalidInput,
            EngineError::Media(_) => FailureCause::MediaFailure,
            EngineError::Analysis(
                AnalysisError::InvalidMetrics { .. }
                | AnalysisError::InvalidHint(_)
                | AnalysisError::InvalidSelection(_),
            ) => FailureCause::InvalidInput,
            EngineError::Analysis(AnalysisError::Media(_)) => FailureCause::MediaFailure,
            EngineError::Synthesis(_) => FailureCause::SynthesisFailure,
            EngineError::Timeout(_) => FailureCause::Timeout,
            EngineError::Cancelled => FailureCause::Cancelled,
            _ => FailureCause::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_invalid_input() {
        let err = EngineError::Media(MediaError::EmptyVideo {
            path: "clip.mp4".into(),
            duration: 0.0,
        });
        assert_eq!(err.failure_cause(), FailureCause::InvalidInput);

        let err = EngineError::Analysis(AnalysisError::InvalidHint(120.0));
        assert_eq!(err.failure_cause(), FailureCause::InvalidInput);
    }

    #[test]
    fn lifecycle_errors_map_to_their_causes() {
        assert_eq!(EngineError::Timeout(30).failure_cause(), FailureCause::Timeout);
        assert_eq!(EngineError::Cancelled.failure_cause(), FailureCause::Cancelled);
        assert_eq!(
            EngineError::Synthesis(SynthesisError::EmptyScript).failure_cause(),
            FailureCause::SynthesisFailure
        );
    }
}
