//! Persistence for the Reelcraft generation core.
//!
//! The core treats storage as an abstract key/value + query surface
//! ([`KeyValueStore`]). Production deployments put a durable backend
//! behind it; [`FallbackStore`] layers an in-process [`MemoryStore`]
//! underneath so job tracking survives durable-store outages, with every
//! degradation emitted as a structured, observable event.

pub mod error;
pub mod fallback;
pub mod jobs;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use fallback::FallbackStore;
pub use jobs::JobRepo;
pub use store::{KeyValueStore, MemoryStore};
