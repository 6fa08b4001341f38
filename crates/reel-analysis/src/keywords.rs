//! Keyword extraction and narration beat to segment matching.

use std::collections::BTreeSet;

use tracing::debug;

use reel_models::{CaptionBeat, VideoSegment};

/// Words too common to carry matching signal.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "its", "new", "now", "old", "see", "two",
    "who", "did", "that", "this", "with", "from", "they", "will", "have", "been", "were", "when",
    "what", "your", "their", "there", "then", "than", "them", "these", "those", "into", "over",
    "just", "like", "very", "more", "most", "some", "such", "only", "about", "which", "while",
];

/// Lowercase tokenization minus stopwords; tokens shorter than three
/// characters are dropped.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Split a script into timed caption beats, allocating the narration
/// duration across sentences proportionally to their word counts.
pub fn beats_from_script(script: &str, narration_duration: f64) -> Vec<CaptionBeat> {
    let sentences: Vec<&str> = script
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let total_words: usize = sentences
        .iter()
        .map(|s| s.split_whitespace().count())
        .sum();
    if total_words == 0 {
        return Vec::new();
    }

    let mut beats = Vec::with_capacity(sentences.len());
    let mut cursor = 0.0;
    for sentence in sentences {
        let words = sentence.split_whitespace().count();
        let share = words as f64 / total_words as f64 * narration_duration;
        let beat = CaptionBeat::new(cursor, cursor + share, sentence)
            .with_keywords(extract_keywords(sentence));
        cursor += share;
        beats.push(beat);
    }
    beats
}

/// Match narration beats to segments in chronological beat order.
///
/// For each beat the highest-scoring unused segment whose tags overlap the
/// beat's keywords wins; ties break by score, then by how close the
/// segment's duration sits to the beat's. A beat with no keyword overlap
/// falls back to the best remaining segment by score, so every beat is
/// matched while segments last. Each segment is consumed at most once.
pub fn match_beats(
    beats: &[CaptionBeat],
    segments: &[VideoSegment],
) -> Vec<(CaptionBeat, VideoSegment)> {
    let mut remaining: Vec<VideoSegment> = segments.to_vec();
    let mut matched = Vec::with_capacity(beats.len());

    for beat in beats {
        if remaining.is_empty() {
            break;
        }

        let pick = best_overlap_index(beat, &remaining)
            .unwrap_or_else(|| best_score_index(&remaining));

        let segment = remaining.swap_remove(pick);
        debug!(
            beat_start = format!("{:.2}", beat.start_time),
            segment_start = format!("{:.2}", segment.start_time),
            score = format!("{:.1}", segment.composite_score),
            "Matched beat to segment"
        );
        matched.push((beat.clone(), segment));
    }

    matched
}

/// Index of the best segment whose tags overlap the beat's keywords, or
/// `None` when nothing overlaps.
fn best_overlap_index(beat: &CaptionBeat, segments: &[VideoSegment]) -> Option<usize> {
    segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.tags.iter().any(|t| beat.keywords.contains(t)))
        .max_by(|(_, a), (_, b)| {
            a.composite_score
                .partial_cmp(&b.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    // Closer duration fit wins a score tie
                    let da = (a.duration() - beat.duration()).abs();
                    let db = (b.duration() - beat.duration()).abs();
                    db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
                })
        })
        .map(|(i, _)| i)
}

/// Index of the highest-scoring segment.
fn best_score_index(segments: &[VideoSegment]) -> usize {
    segments
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.composite_score
                .partial_cmp(&b.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::{Fingerprint, FrameWindowMetrics, SourceId};

    fn segment(start: f64, duration: f64, score: f64, tags: &[&str]) -> VideoSegment {
        VideoSegment {
            source_id: SourceId::from_string("src"),
            start_time: start,
            end_time: start + duration,
            metrics: FrameWindowMetrics {
                start_time: start,
                end_time: start + duration,
                motion: 0.5,
                variance: 0.5,
                blur: 0.5,
                contrast: 0.5,
                brightness: 0.5,
                fingerprint: Fingerprint(0),
            },
            composite_score: score,
            fingerprint: Fingerprint(0),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn beat(start: f64, end: f64, text: &str) -> CaptionBeat {
        CaptionBeat::new(start, end, text).with_keywords(extract_keywords(text))
    }

    #[test]
    fn keywords_drop_stopwords_and_short_tokens() {
        let kw = extract_keywords("The storm is coming over the dark mountains!");
        assert!(kw.contains("storm"));
        assert!(kw.contains("dark"));
        assert!(kw.contains("mountains"));
        assert!(!kw.contains("the"));
        assert!(!kw.contains("is"));
    }

    #[test]
    fn script_beats_split_time_by_word_share() {
        let beats = beats_from_script("One two three four. Five six.", 12.0);
        assert_eq!(beats.len(), 2);
        assert!((beats[0].duration() - 8.0).abs() < 1e-9);
        assert!((beats[1].duration() - 4.0).abs() < 1e-9);
        assert!((beats[1].end_time - 12.0).abs() < 1e-9);
    }

    #[test]
    fn empty_script_yields_no_beats() {
        assert!(beats_from_script("   ", 10.0).is_empty());
    }

    #[test]
    fn overlapping_keywords_beat_raw_score() {
        let segments = vec![
            segment(0.0, 3.0, 95.0, &["static", "bright"]),
            segment(10.0, 3.0, 60.0, &["dynamic", "dark"]),
        ];
        let beats = vec![beat(0.0, 3.0, "A dynamic chase through the night.")];

        let matched = match_beats(&beats, &segments);
        assert_eq!(matched.len(), 1);
        // The lower-scoring segment wins on keyword overlap
        assert_eq!(matched[0].1.start_time, 10.0);
    }

    #[test]
    fn no_overlap_falls_back_to_best_score() {
        let segments = vec![
            segment(0.0, 3.0, 70.0, &["static"]),
            segment(10.0, 3.0, 90.0, &["dynamic"]),
        ];
        let beats = vec![beat(0.0, 3.0, "Nothing matches these words.")];

        let matched = match_beats(&beats, &segments);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].1.composite_score, 90.0);
    }

    #[test]
    fn segments_are_consumed_at_most_once() {
        let segments = vec![
            segment(0.0, 3.0, 90.0, &["dynamic"]),
            segment(10.0, 3.0, 80.0, &["dynamic"]),
        ];
        let beats = vec![
            beat(0.0, 2.0, "A dynamic opening."),
            beat(2.0, 4.0, "Another dynamic moment."),
            beat(4.0, 6.0, "And a dynamic finish."),
        ];

        let matched = match_beats(&beats, &segments);
        // Two segments serve two beats; the third beat goes unserved
        assert_eq!(matched.len(), 2);
        assert_ne!(matched[0].1.start_time, matched[1].1.start_time);
    }

    #[test]
    fn score_ties_break_by_duration_fit() {
        let segments = vec![
            segment(0.0, 8.0, 80.0, &["dynamic"]),
            segment(20.0, 2.0, 80.0, &["dynamic"]),
        ];
        let beats = vec![beat(0.0, 2.5, "A dynamic moment.")];

        let matched = match_beats(&beats, &segments);
        // 2s segment sits closer to the 2.5s beat than the 8s one
        assert_eq!(matched[0].1.start_time, 20.0);
    }
}
