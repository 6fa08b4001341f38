//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the media toolkit.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Cannot decode {path}: {message}")]
    DecodeFailed {
        path: PathBuf,
        message: String,
        stderr: Option<String>,
    },

    #[error("Source has near-zero duration ({duration:.3}s): {path}")]
    EmptyVideo { path: PathBuf, duration: f64 },

    #[error("Render failed: {message}")]
    RenderFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("No video stream in {0}")]
    NoVideoStream(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFprobe output parse error: {0}")]
    ProbeParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a decode failure for a path.
    pub fn decode_failed(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::DecodeFailed {
            path: path.into(),
            message: message.into(),
            stderr,
        }
    }

    /// Create a render failure.
    pub fn render_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::RenderFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }
}
