//! Timed narration text beats.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A timed unit of narration text, produced by the transcription/synthesis
/// collaborator and consumed read-only by segment matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionBeat {
    /// Beat start in seconds from narration start.
    pub start_time: f64,

    /// Beat end in seconds.
    pub end_time: f64,

    /// The narration text spoken during this beat.
    pub text: String,

    /// Keywords extracted from the text, used for segment matching.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl CaptionBeat {
    /// Create a beat with no keywords yet.
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
            keywords: BTreeSet::new(),
        }
    }

    /// Set the keyword set.
    pub fn with_keywords(mut self, keywords: BTreeSet<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Beat duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Number of words in the beat text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
