//! Diversified variant selection.
//!
//! Walks score-ranked candidates greedily per variant, skipping overlaps,
//! until the accumulated duration lands inside the target band. Later
//! variants exclude the top-ranked picks already consumed by earlier ones,
//! so siblings trend toward different (still high-scoring) material.

use std::collections::HashSet;

use tracing::{debug, warn};

use reel_models::{AssemblyWarning, VariantPlan, VideoSegment};

use crate::dedup::sort_by_score;
use crate::error::{AnalysisError, AnalysisResult};

/// Selection configuration.
#[derive(Debug, Clone, Copy)]
pub struct SelectorConfig {
    /// How many of each produced variant's best picks are withheld from
    /// later variants. Higher values diversify harder at the cost of
    /// pushing later variants down the ranking.
    pub diversify_depth: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { diversify_depth: 2 }
    }
}

/// Result of a selection pass: the variants that could be formed, plus a
/// shortfall warning when fewer than requested were feasible.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub variants: Vec<VariantPlan>,
    pub warning: Option<AssemblyWarning>,
}

/// Builds diversified non-overlapping segment sets from scored candidates.
#[derive(Debug, Clone, Default)]
pub struct SegmentSelector {
    config: SelectorConfig,
}

/// Identity key for a candidate's exact time range.
fn range_key(segment: &VideoSegment) -> (u64, u64) {
    (segment.start_time.to_bits(), segment.end_time.to_bits())
}

impl SegmentSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Select up to `variant_count` diversified variants whose total
    /// duration lands in `[target - tolerance, target + tolerance]`.
    pub fn select(
        &self,
        candidates: &[VideoSegment],
        target_duration: f64,
        variant_count: usize,
        tolerance: f64,
    ) -> AnalysisResult<SelectionOutcome> {
        if variant_count == 0 {
            return Err(AnalysisError::InvalidSelection(
                "variant_count must be at least 1".into(),
            ));
        }
        if target_duration <= 0.0 {
            return Err(AnalysisError::InvalidSelection(format!(
                "target_duration must be positive, got {target_duration}"
            )));
        }
        if tolerance < 0.0 || tolerance >= target_duration {
            return Err(AnalysisError::InvalidSelection(format!(
                "tolerance {tolerance} must be in [0, target_duration)"
            )));
        }

        let mut ranked = candidates.to_vec();
        sort_by_score(&mut ranked);

        let mut variants: Vec<VariantPlan> = Vec::with_capacity(variant_count);
        let mut withheld: HashSet<(u64, u64)> = HashSet::new();

        for _ in 0..variant_count {
            let Some(chosen) = greedy_pick(&ranked, &withheld, target_duration, tolerance) else {
                break;
            };

            // Withhold this variant's best picks from later rounds before
            // the chosen list is consumed by plan construction.
            let mut by_score = chosen.clone();
            sort_by_score(&mut by_score);
            for seg in by_score.iter().take(self.config.diversify_depth) {
                withheld.insert(range_key(seg));
            }

            let plan = VariantPlan::new(variants.len(), chosen)?;

            if variants.iter().any(|v| v.same_segment_set(&plan)) {
                // Exact repeat of an earlier sibling: infeasible rather
                // than a duplicate deliverable.
                break;
            }

            debug!(
                variant = plan.variant_index,
                segments = plan.segments.len(),
                duration_s = format!("{:.2}", plan.total_duration),
                "Variant selected"
            );
            variants.push(plan);
        }

        let missing = variant_count - variants.len();
        let warning = if missing > 0 {
            warn!(
                requested = variant_count,
                produced = variants.len(),
                "Could not form all requested variants"
            );
            Some(AssemblyWarning::PartialResult { missing })
        } else {
            None
        };

        Ok(SelectionOutcome { variants, warning })
    }
}

/// One greedy walk down the ranking. Returns `None` when the candidates
/// cannot fill the target band.
fn greedy_pick(
    ranked: &[VideoSegment],
    withheld: &HashSet<(u64, u64)>,
    target: f64,
    tolerance: f64,
) -> Option<Vec<VideoSegment>> {
    let mut chosen: Vec<VideoSegment> = Vec::new();
    let mut total = 0.0;

    for candidate in ranked {
        if total >= target - tolerance {
            break;
        }
        if withheld.contains(&range_key(candidate)) {
            continue;
        }
        if chosen.iter().any(|c| c.overlaps(candidate)) {
            continue;
        }
        if total + candidate.duration() > target + tolerance {
            continue;
        }
        total += candidate.duration();
        chosen.push(candidate.clone());
    }

    (total >= target - tolerance).then_some(chosen)
}
