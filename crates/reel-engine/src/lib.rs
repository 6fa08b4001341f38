//! Job coordination and script-to-video assembly for Reelcraft.
//!
//! This crate owns the concurrency and lifecycle model of the generation
//! core: per-project mutual exclusion, job progress with dual persistence,
//! the analysis pipeline, and the per-variant assembly orchestrator. The
//! surrounding platform (HTTP layer, auth, storage backends) talks to it
//! through [`GenerationService`] and [`JobCoordinator`].

pub mod assembly;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod service;

pub use assembly::{AssembledVariant, AssemblyOrchestrator, AssemblySettings, VariantStage};
pub use config::EngineConfig;
pub use coordinator::{CancelSignal, JobCoordinator, ProjectLock};
pub use error::{EngineError, EngineResult};
pub use logging::JobLog;
pub use pipeline::{AnalyzedSource, GenerationPipeline, VisionHintProvider};
pub use service::{GenerationOutcome, GenerationRequest, GenerationService};

/// Initialize tracing for an embedding binary. Filter via `RUST_LOG`
/// (default `info`).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}
