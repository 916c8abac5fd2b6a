//! Gleaner SDK
//!
//! Shared library providing the platform adapter contract for Gleaner.
//! This crate is used by both the engine and out-of-tree adapter authors:
//! it defines the `PlatformAdapter` trait, the data types that cross the
//! adapter boundary, and the shared error type.

/// Platform adapter trait
pub mod adapter;

/// Error types and handling
pub mod errors;

/// Adapter boundary types
pub mod types;

// Re-export commonly used types
pub use adapter::{PlatformAdapter, DEFAULT_DAILY_CAP};
pub use errors::{EngineError, GleanerErrorExt};
pub use types::{
    Annotation, ConnectStatus, HttpSummary, SampleOutcome, SampleUnit, Scope, MAX_SCOPE_ID_LEN,
};
