//! Error types for analysis operations.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur in the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("metric {field} out of range: {value}")]
    InvalidMetrics { field: &'static str, value: f64 },

    #[error("vision hint out of range: {0} (expected 0-100)")]
    InvalidHint(f64),

    #[error("invalid selection request: {0}")]
    InvalidSelection(String),

    #[error(transparent)]
    Plan(#[from] reel_models::PlanError),

    #[error(transparent)]
    Media(#[from] reel_media::MediaError),
}

impl AnalysisError {
    /// Create an out-of-range metric error.
    pub fn invalid_metric(field: &'static str, value: f64) -> Self {
        Self::InvalidMetrics { field, value }
    }
}
