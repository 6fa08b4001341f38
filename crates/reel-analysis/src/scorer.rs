//! Composite segment scoring.
//!
//! Combines the window signals into one `[0, 100]` quality score. Movement
//! and sharpness dominate the weighting since they matter most for
//! short-form clip selection. An optional external vision hint is blended
//! in with a configurable mix ratio; with no hint the formula output passes
//! through untouched.

use reel_models::{FrameWindowMetrics, SourceId, VideoSegment};

use crate::error::{AnalysisError, AnalysisResult};

/// Fixed formula weights, summing to 1.0.
pub const WEIGHT_MOTION: f64 = 0.40;
pub const WEIGHT_VARIANCE: f64 = 0.20;
pub const WEIGHT_BLUR: f64 = 0.20;
pub const WEIGHT_CONTRAST: f64 = 0.15;
pub const WEIGHT_BRIGHTNESS: f64 = 0.05;

/// Scoring configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScorerConfig {
    /// Fraction of the composite taken from the external vision hint when
    /// one is present, in `[0, 1]`. The original intent behind the blend is
    /// ambiguous upstream, so it stays a tunable rather than a constant.
    pub hint_mix: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self { hint_mix: 0.3 }
    }
}

/// Scores candidate windows into segments.
#[derive(Debug, Clone, Default)]
pub struct SegmentScorer {
    config: ScorerConfig,
}

impl SegmentScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Score one window, producing an immutable candidate segment.
    ///
    /// `hint` is an optional external per-window quality estimate in
    /// `[0, 100]`. Fails with `InvalidMetrics` on out-of-range signals and
    /// `InvalidHint` on an out-of-range hint; never fails on a missing hint.
    pub fn score(
        &self,
        source_id: &SourceId,
        window: &FrameWindowMetrics,
        hint: Option<f64>,
    ) -> AnalysisResult<VideoSegment> {
        validate_window(window)?;

        let formula = 100.0
            * (WEIGHT_MOTION * window.motion
                + WEIGHT_VARIANCE * window.variance
                + WEIGHT_BLUR * window.blur
                + WEIGHT_CONTRAST * window.contrast
                + WEIGHT_BRIGHTNESS * window.brightness);

        let composite = match hint {
            Some(h) => {
                if !(0.0..=100.0).contains(&h) {
                    return Err(AnalysisError::InvalidHint(h));
                }
                let mix = self.config.hint_mix.clamp(0.0, 1.0);
                (1.0 - mix) * formula + mix * h
            }
            None => formula,
        };

        Ok(VideoSegment {
            source_id: source_id.clone(),
            start_time: window.start_time,
            end_time: window.end_time,
            metrics: *window,
            composite_score: composite.clamp(0.0, 100.0),
            fingerprint: window.fingerprint,
            tags: derive_tags(window),
        })
    }
}

/// Derive intrinsic keyword tags from a window's signals, used for
/// narration matching when no manual tags exist.
pub fn derive_tags(window: &FrameWindowMetrics) -> Vec<String> {
    let mut tags = Vec::with_capacity(3);

    tags.push(
        match window.motion {
            m if m < 0.05 => "static",
            m if m < 0.3 => "active",
            _ => "dynamic",
        }
        .to_string(),
    );
    tags.push(if window.brightness >= 0.5 { "bright" } else { "dark" }.to_string());
    tags.push(if window.blur >= 0.3 { "sharp" } else { "soft" }.to_string());

    tags
}

fn validate_window(window: &FrameWindowMetrics) -> AnalysisResult<()> {
    let fields = [
        ("motion", window.motion),
        ("variance", window.variance),
        ("blur", window.blur),
        ("contrast", window.contrast),
        ("brightness", window.brightness),
    ];
    for (field, value) in fields {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(AnalysisError::invalid_metric(field, value));
        }
    }
    if window.end_time <= window.start_time {
        return Err(AnalysisError::invalid_metric(
            "end_time",
            window.end_time - window.start_time,
        ));
    }
    Ok(())
}
