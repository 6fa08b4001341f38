//! Narration synthesis for the Reelcraft generation core.
//!
//! The core depends on one narrow contract: text plus voice settings in,
//! audio plus duration out. Concrete providers live behind
//! [`NarrationProvider`]; selection between providers (cost/quality,
//! fallback chains) is the embedding service's configuration, not encoded
//! here.

pub mod client;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{HttpNarrationProvider, ProviderConfig};
pub use error::{SynthesisError, SynthesisResult};
pub use provider::{FileNarrationSink, NarrationProvider, NarrationSink};
pub use types::{Narration, VoiceSettings};
