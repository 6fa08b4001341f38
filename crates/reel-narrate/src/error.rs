//! Narration synthesis error types.

use thiserror::Error;

pub type SynthesisResult<T> = Result<T, SynthesisError>;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Synthesis request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Script text is empty")]
    EmptyScript,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    /// True when a different provider or a later attempt could plausibly
    /// succeed. Retrying is the caller's decision, never made here.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SynthesisError::ProviderUnavailable(_)
                | SynthesisError::Network(_)
                | SynthesisError::RequestFailed { status: 500..=599, .. }
        )
    }
}
