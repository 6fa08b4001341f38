//! Render plans handed to the external media toolkit.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::segment::SourceId;
use crate::variant::VariantPlan;

/// One source time range in playback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRange {
    /// Start in seconds within the source.
    pub start: f64,
    /// End in seconds within the source.
    pub end: f64,
}

impl RenderRange {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Value object describing the final encode: ordered source ranges plus
/// filter parameters. The toolkit's process lifecycle is not owned here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderPlan {
    /// Source video the ranges index into.
    pub source_id: SourceId,

    /// Variant this plan was built from.
    pub variant_index: usize,

    /// Time ranges in playback order.
    pub ranges: Vec<RenderRange>,

    /// Narration audio reference to mux in, when script-driven.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_audio: Option<String>,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Output frame rate.
    pub fps: f64,
}

impl RenderPlan {
    /// Build a render plan from an assembled variant.
    pub fn from_variant(plan: &VariantPlan, width: u32, height: u32, fps: f64) -> Self {
        Self {
            source_id: plan
                .segments
                .first()
                .map(|s| s.source_id.clone())
                .unwrap_or_default(),
            variant_index: plan.variant_index,
            ranges: plan
                .segments
                .iter()
                .map(|s| RenderRange {
                    start: s.start_time,
                    end: s.end_time,
                })
                .collect(),
            narration_audio: plan.narration_audio.clone(),
            width,
            height,
            fps,
        }
    }

    /// Total output duration in seconds.
    pub fn total_duration(&self) -> f64 {
        self.ranges.iter().map(RenderRange::duration).sum()
    }
}
