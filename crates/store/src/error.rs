//! Storage error types.

use thiserror::Error;

/// Errors surfaced by repository implementations.
///
/// "Not found" is never an error; lookups return `Ok(None)` or an empty
/// list. `StoreError` is reserved for actual backend faults.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for repository results.
pub type Result<T> = std::result::Result<T, StoreError>;
