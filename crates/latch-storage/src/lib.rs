//! Storage abstraction for the latch console.
//!
//! Backend crates (e.g., latch-store-memory) implement the [`RealtimeStore`]
//! trait so the console services don't depend on any specific realtime
//! database engine. This crate also owns the domain types shared across the
//! workspace and the path schema of the document tree.

use thiserror::Error;

mod paths;
mod store;
mod time;
mod types;

pub use paths::*;
pub use store::*;
pub use time::*;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}
