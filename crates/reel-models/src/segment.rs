//! Scored video segments and their frame metrics.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    /// Generate a new random source ID.
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

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Perceptual fingerprint of a window's representative frame.
///
/// A 64-bit difference hash; near-duplicate frames are detected by
/// Hamming distance between fingerprints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Number of differing bits between two fingerprints.
    pub fn hamming_distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Normalized per-window quality signals, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameWindowMetrics {
    /// Window start in seconds from source start.
    pub start_time: f64,

    /// Window end in seconds.
    pub end_time: f64,

    /// Inter-frame pixel-difference magnitude.
    pub motion: f64,

    /// Intensity variance (visual complexity proxy).
    pub variance: f64,

    /// Edge-response sharpness (higher = sharper).
    pub blur: f64,

    /// Luma dynamic range.
    pub contrast: f64,

    /// Mean luminance.
    pub brightness: f64,

    /// Fingerprint of the window's representative frame.
    pub fingerprint: Fingerprint,
}

impl FrameWindowMetrics {
    /// Window duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// True when every signal lies in `[0, 1]`.
    pub fn in_range(&self) -> bool {
        [
            self.motion,
            self.variance,
            self.blur,
            self.contrast,
            self.brightness,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}

/// A candidate or selected sub-clip, immutable once scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSegment {
    /// Source video this segment was cut from.
    pub source_id: SourceId,

    /// Start in seconds from source start.
    pub start_time: f64,

    /// End in seconds.
    pub end_time: f64,

    /// The raw window signals the score was computed from.
    pub metrics: FrameWindowMetrics,

    /// Composite quality score in `[0, 100]`.
    pub composite_score: f64,

    /// Perceptual fingerprint for duplicate detection.
    pub fingerprint: Fingerprint,

    /// Keyword tags for narration matching. Derived from metrics when no
    /// manual tags are supplied.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl VideoSegment {
    /// Segment duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// True when this segment's time range overlaps `other`'s.
    pub fn overlaps(&self, other: &VideoSegment) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    /// Return a copy trimmed to end at `end_time`.
    pub fn trimmed_to(&self, end_time: f64) -> Self {
        Self {
            end_time: end_time.max(self.start_time),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64) -> VideoSegment {
        VideoSegment {
            source_id: SourceId::from_string("src"),
            start_time: start,
            end_time: end,
            metrics: FrameWindowMetrics {
                start_time: start,
                end_time: end,
                motion: 0.5,
                variance: 0.5,
                blur: 0.5,
                contrast: 0.5,
                brightness: 0.5,
                fingerprint: Fingerprint(0),
            },
            composite_score: 50.0,
            fingerprint: Fingerprint(0),
            tags: Vec::new(),
        }
    }

    #[test]
    fn hamming_distance_counts_differing_bits() {
        let a = Fingerprint(0b1010);
        let b = Fingerprint(0b0110);
        assert_eq!(a.hamming_distance(&b), 2);
        assert_eq!(a.hamming_distance(&a), 0);
        assert_eq!(Fingerprint(0).hamming_distance(&Fingerprint(u64::MAX)), 64);
    }

    #[test]
    fn overlap_detection() {
        let a = segment(0.0, 5.0);
        let b = segment(4.0, 9.0);
        let c = segment(5.0, 9.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Touching segments do not overlap
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn metrics_range_check() {
        let mut m = segment(0.0, 1.0).metrics;
        assert!(m.in_range());
        m.motion = 1.2;
        assert!(!m.in_range());
    }
}
