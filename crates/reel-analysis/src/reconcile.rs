//! Narration/video duration reconciliation.
//!
//! Pure function over its inputs: extends a plan with unused candidates
//! when the narration runs longer than the video, or trims the final
//! segment when the video runs longer than the narration. Interior
//! segments are never touched, preserving pacing.

use tracing::debug;

use reel_models::{AssemblyWarning, VariantPlan, VideoSegment};

use crate::dedup::sort_by_score;
use crate::error::AnalysisResult;

/// Shortest a trimmed segment is allowed to get.
const MIN_SEGMENT_SECS: f64 = 0.5;

/// Reconcile a plan's total duration against the narration duration.
///
/// `pool` is the de-duplicated candidate pool selection drew from;
/// segments already in the plan, overlapping it, or within
/// `hamming_threshold` of a planned fingerprint are not eligible for
/// extension. Returns a new plan; inputs are left untouched.
pub fn reconcile(
    plan: &VariantPlan,
    pool: &[VideoSegment],
    narration_duration: f64,
    tolerance: f64,
    hamming_threshold: u32,
) -> AnalysisResult<VariantPlan> {
    let video_duration = plan.total_duration;

    if (video_duration - narration_duration).abs() <= tolerance {
        return Ok(plan.clone());
    }

    if video_duration < narration_duration - tolerance {
        extend(plan, pool, narration_duration, tolerance, hamming_threshold)
    } else {
        Ok(trim(plan, narration_duration))
    }
}

/// Append unused, non-overlapping, non-duplicate candidates in score order
/// until the gap closes or the pool is exhausted.
fn extend(
    plan: &VariantPlan,
    pool: &[VideoSegment],
    narration_duration: f64,
    tolerance: f64,
    hamming_threshold: u32,
) -> AnalysisResult<VariantPlan> {
    let mut ranked = pool.to_vec();
    sort_by_score(&mut ranked);

    let mut segments = plan.segments.clone();
    let mut total = plan.total_duration;
    let mut appended = 0usize;

    for candidate in ranked {
        if total >= narration_duration - tolerance {
            break;
        }
        if segments.iter().any(|s| s.overlaps(&candidate)) {
            continue;
        }
        if segments
            .iter()
            .any(|s| s.fingerprint.hamming_distance(&candidate.fingerprint) <= hamming_threshold)
        {
            continue;
        }
        total += candidate.duration();
        segments.push(candidate);
        appended += 1;
    }

    debug!(
        variant = plan.variant_index,
        appended,
        total_s = format!("{:.2}", total),
        narration_s = format!("{:.2}", narration_duration),
        "Extended plan toward narration duration"
    );

    let mut rebuilt = VariantPlan::new(plan.variant_index, segments)?;
    rebuilt.narration_text = plan.narration_text.clone();
    rebuilt.narration_audio = plan.narration_audio.clone();
    rebuilt.caption_beats = plan.caption_beats.clone();
    rebuilt.warnings = plan.warnings.clone();

    if rebuilt.total_duration > narration_duration + tolerance {
        // The last append overshot the band; pull its end back in.
        return Ok(trim(&rebuilt, narration_duration));
    }

    if rebuilt.total_duration < narration_duration - tolerance {
        let gap = narration_duration - rebuilt.total_duration;
        return Ok(rebuilt.with_warning(AssemblyWarning::InsufficientMaterial { gap }));
    }

    Ok(rebuilt)
}

/// Close the excess by moving only the last segment's end time.
fn trim(plan: &VariantPlan, narration_duration: f64) -> VariantPlan {
    let mut trimmed = plan.clone();
    let excess = trimmed.total_duration - narration_duration;

    if let Some(last) = trimmed.segments.last() {
        let cut = excess.min(last.duration() - MIN_SEGMENT_SECS).max(0.0);
        let new_end = last.end_time - cut;
        let last_index = trimmed.segments.len() - 1;
        trimmed.segments[last_index] = last.trimmed_to(new_end);
    }

    trimmed.recompute_duration();
    debug!(
        variant = trimmed.variant_index,
        total_s = format!("{:.2}", trimmed.total_duration),
        "Trimmed plan tail to narration duration"
    );
    trimmed
}
