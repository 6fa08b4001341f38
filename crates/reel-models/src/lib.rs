//! Shared data models for the Reelcraft generation core.
//!
//! This crate provides Serde-serializable types for:
//! - Scored video segments and their frame metrics
//! - Variant plans (candidate finished outputs)
//! - Caption beats for narration matching
//! - Generation jobs and their lifecycle
//! - Render plans handed to the media toolkit

pub mod caption;
pub mod job;
pub mod render_plan;
pub mod segment;
pub mod timestamp;
pub mod variant;

// Re-export common types
pub use caption::CaptionBeat;
pub use job::{FailureCause, GenerationJob, JobId, JobStatus, ProfileId, ProjectId};
pub use render_plan::{RenderPlan, RenderRange};
pub use segment::{Fingerprint, FrameWindowMetrics, SourceId, VideoSegment};
pub use timestamp::format_timestamp;
pub use variant::{AssemblyWarning, PlanError, VariantPlan};
