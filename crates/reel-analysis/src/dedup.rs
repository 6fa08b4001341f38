//! Near-duplicate candidate removal.

use tracing::debug;

use reel_models::VideoSegment;

/// Default Hamming threshold below which two fingerprints count as
/// near-duplicates.
pub const DEFAULT_HAMMING_THRESHOLD: u32 = 12;

/// Removes near-duplicate candidates by fingerprint distance.
///
/// Greedy pass in descending score order (ties broken by earlier start
/// time): a segment survives only if its fingerprint is farther than the
/// threshold from every already-kept fingerprint. Static shots and
/// repeated content collapse to their best-scoring instance.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    hamming_threshold: u32,
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_HAMMING_THRESHOLD)
    }
}

impl DuplicateFilter {
    pub fn new(hamming_threshold: u32) -> Self {
        Self { hamming_threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> u32 {
        self.hamming_threshold
    }

    /// Filter candidates, returning survivors in descending score order.
    pub fn filter(&self, mut candidates: Vec<VideoSegment>) -> Vec<VideoSegment> {
        sort_by_score(&mut candidates);

        let before = candidates.len();
        let mut kept: Vec<VideoSegment> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let is_duplicate = kept.iter().any(|k| {
                k.fingerprint.hamming_distance(&candidate.fingerprint) <= self.hamming_threshold
            });
            if !is_duplicate {
                kept.push(candidate);
            }
        }

        debug!(
            kept = kept.len(),
            discarded = before - kept.len(),
            threshold = self.hamming_threshold,
            "Duplicate filtering done"
        );
        kept
    }
}

/// Sort descending by composite score; ties go to the earlier start time.
pub(crate) fn sort_by_score(segments: &mut [VideoSegment]) {
    segments.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.start_time
                    .partial_cmp(&b.start_time)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::{Fingerprint, FrameWindowMetrics, SourceId};

    fn segment(start: f64, score: f64, fingerprint: u64) -> VideoSegment {
        VideoSegment {
            source_id: SourceId::from_string("src"),
            start_time: start,
            end_time: start + 3.0,
            metrics: FrameWindowMetrics {
                start_time: start,
                end_time: start + 3.0,
                motion: 0.5,
                variance: 0.5,
                blur: 0.5,
                contrast: 0.5,
                brightness: 0.5,
                fingerprint: Fingerprint(fingerprint),
            },
            composite_score: score,
            fingerprint: Fingerprint(fingerprint),
            tags: Vec::new(),
        }
    }

    #[test]
    fn keeps_best_of_near_duplicates() {
        // 0x0f differs from 0x00 by 4 bits: near-duplicate at threshold 12
        let kept = DuplicateFilter::default().filter(vec![
            segment(0.0, 60.0, 0x00),
            segment(10.0, 80.0, 0x0f),
            segment(20.0, 70.0, u64::MAX),
        ]);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].composite_score, 80.0);
        assert_eq!(kept[1].composite_score, 70.0);
    }

    #[test]
    fn kept_pairs_respect_threshold() {
        let filter = DuplicateFilter::new(12);
        let kept = filter.filter(vec![
            segment(0.0, 90.0, 0x0000_0000_0000_0000),
            segment(5.0, 85.0, 0x0000_0000_0000_00ff), // 8 bits from first
            segment(10.0, 80.0, 0x0000_0000_ffff_ffff), // 32 bits from first
            segment(15.0, 75.0, 0xffff_ffff_ffff_ffff), // 32 bits from third
        ]);

        for (i, a) in kept.iter().enumerate() {
            for b in kept.iter().skip(i + 1) {
                assert!(a.fingerprint.hamming_distance(&b.fingerprint) > filter.threshold());
            }
        }
    }

    #[test]
    fn score_ties_break_by_earlier_start() {
        // Identical fingerprints and scores: the earlier segment survives.
        let kept =
            DuplicateFilter::default().filter(vec![segment(30.0, 50.0, 7), segment(5.0, 50.0, 7)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start_time, 5.0);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(DuplicateFilter::default().filter(Vec::new()).is_empty());
    }
}
