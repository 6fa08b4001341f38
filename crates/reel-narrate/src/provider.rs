//! Provider and sink contracts.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{SynthesisError, SynthesisResult};
use crate::types::{Narration, VoiceSettings};

/// The one contract the core depends on for narration synthesis.
#[async_trait]
pub trait NarrationProvider: Send + Sync {
    /// Synthesize `text` with the given voice, returning audio and its
    /// duration. Implementations surface failures; they do not retry.
    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> SynthesisResult<Narration>;
}

/// Write-through interface for narration audio. Path ownership stays with
/// the caller; the orchestrator only writes through this seam.
#[async_trait]
pub trait NarrationSink: Send + Sync {
    /// Persist one variant's narration, returning the reference (path or
    /// key) later embedded in the render plan.
    async fn write(&self, variant_index: usize, narration: &Narration) -> SynthesisResult<String>;
}

/// Sink writing into a caller-supplied project-scoped directory.
#[derive(Debug, Clone)]
pub struct FileNarrationSink {
    root: PathBuf,
}

impl FileNarrationSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl NarrationSink for FileNarrationSink {
    async fn write(&self, variant_index: usize, narration: &Narration) -> SynthesisResult<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(format!("narration_{variant_index}.wav"));
        tokio::fs::write(&path, &narration.audio).await?;
        debug!(path = %path.display(), bytes = narration.audio.len(), "Wrote narration audio");
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Guard against synthesizing nothing.
pub(crate) fn validate_script(text: &str) -> SynthesisResult<()> {
    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyScript);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_sink_writes_and_returns_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileNarrationSink::new(dir.path());
        let narration = Narration {
            audio: vec![1, 2, 3, 4],
            duration_secs: 0.1,
        };

        let reference = sink.write(2, &narration).await.unwrap();
        assert!(reference.ends_with("narration_2.wav"));
        assert_eq!(std::fs::read(&reference).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            validate_script("  \n "),
            Err(SynthesisError::EmptyScript)
        ));
        assert!(validate_script("hello").is_ok());
    }
}
