//! Variant plans: one independently assembled candidate output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::caption::CaptionBeat;
use crate::segment::VideoSegment;

/// Error raised when a plan violates its construction invariants.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("segments {first} and {second} overlap ({first_range} vs {second_range})")]
    OverlappingSegments {
        first: usize,
        second: usize,
        first_range: String,
        second_range: String,
    },

    #[error("segment {index} has non-positive duration ({start} >= {end})")]
    EmptySegment { index: usize, start: f64, end: f64 },
}

/// Non-fatal condition attached to a best-effort result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyWarning {
    /// Fewer variants could be formed than requested.
    PartialResult {
        /// How many requested variants could not be produced.
        missing: usize,
    },
    /// The candidate pool ran out before the duration gap closed.
    InsufficientMaterial {
        /// Remaining gap in seconds between video and narration duration.
        gap: f64,
    },
}

/// One candidate finished output: an ordered, non-overlapping segment set,
/// optionally enriched with narration and caption beats.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VariantPlan {
    /// Index of this variant among its siblings (0-based).
    pub variant_index: usize,

    /// Segments in playback order, sorted by start time, non-overlapping.
    pub segments: Vec<VideoSegment>,

    /// Sum of segment durations in seconds.
    pub total_duration: f64,

    /// Narration script text, when script-driven.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_text: Option<String>,

    /// Reference to the synthesized narration audio (caller-scoped path or key).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_audio: Option<String>,

    /// Timed narration beats, when script-driven.
    #[serde(default)]
    pub caption_beats: Vec<CaptionBeat>,

    /// Non-fatal conditions encountered while building this plan.
    #[serde(default)]
    pub warnings: Vec<AssemblyWarning>,
}

impl VariantPlan {
    /// Build a plan from selected segments, verifying the ordering and
    /// non-overlap invariants. Segments are sorted by start time first.
    pub fn new(variant_index: usize, mut segments: Vec<VideoSegment>) -> Result<Self, PlanError> {
        segments.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for (i, seg) in segments.iter().enumerate() {
            if seg.duration() <= 0.0 {
                return Err(PlanError::EmptySegment {
                    index: i,
                    start: seg.start_time,
                    end: seg.end_time,
                });
            }
        }

        for pair in segments.windows(2).enumerate() {
            let (i, w) = pair;
            if w[0].overlaps(&w[1]) {
                return Err(PlanError::OverlappingSegments {
                    first: i,
                    second: i + 1,
                    first_range: format!("{:.3}-{:.3}", w[0].start_time, w[0].end_time),
                    second_range: format!("{:.3}-{:.3}", w[1].start_time, w[1].end_time),
                });
            }
        }

        let total_duration = segments.iter().map(VideoSegment::duration).sum();

        Ok(Self {
            variant_index,
            segments,
            total_duration,
            narration_text: None,
            narration_audio: None,
            caption_beats: Vec::new(),
            warnings: Vec::new(),
        })
    }

    /// Attach a warning to this plan.
    pub fn with_warning(mut self, warning: AssemblyWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Recompute `total_duration` from the segment list.
    pub fn recompute_duration(&mut self) {
        self.total_duration = self.segments.iter().map(VideoSegment::duration).sum();
    }

    /// True when two plans select exactly the same segment time ranges.
    pub fn same_segment_set(&self, other: &VariantPlan) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| {
                    (a.start_time - b.start_time).abs() < f64::EPSILON
                        && (a.end_time - b.end_time).abs() < f64::EPSILON
                })
    }

    /// True when any `InsufficientMaterial` warning is attached.
    pub fn is_under_filled(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, AssemblyWarning::InsufficientMaterial { .. }))
    }
}
