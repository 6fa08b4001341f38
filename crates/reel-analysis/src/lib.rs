//! Segment analysis and selection engine.
//!
//! The pipeline here turns a raw source video into diversified sets of
//! scored, non-overlapping sub-clips and reconciles them against narration:
//!
//! 1. [`metrics`] - windowed frame signals from a decode pass
//! 2. [`scorer`] - composite quality score per window
//! 3. [`dedup`] - perceptual-hash duplicate removal
//! 4. [`selector`] - diversified variant selection
//! 5. [`reconcile`] - narration/video duration reconciliation
//! 6. [`keywords`] - narration beat to segment matching

pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod keywords;
pub mod metrics;
pub mod reconcile;
pub mod scorer;
pub mod selector;

pub use dedup::DuplicateFilter;
pub use error::{AnalysisError, AnalysisResult};
pub use fingerprint::fingerprint_frame;
pub use keywords::{beats_from_script, extract_keywords, match_beats};
pub use metrics::{ExtractorParams, MetricsExtractor, WindowMetricsStream};
pub use reconcile::reconcile;
pub use scorer::{ScorerConfig, SegmentScorer};
pub use selector::{SegmentSelector, SelectionOutcome, SelectorConfig};
