//! Error types for queue management

use thiserror::Error;

/// Queue errors
///
/// Reaching the end of the queue is not an error: navigation reports it as a
/// terminal [`NavigationResult`](crate::NavigationResult). Cancelled
/// background work is not an error either.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Index out of bounds
    #[error("Index out of bounds: {index} (queue length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A reported edit does not match the queue's entries
    #[error("Edit does not match the queue: {0}")]
    EditMismatch(String),

    /// Sibling enumeration failed (folder missing, permission denied, ...)
    #[error("Sibling enumeration failed: {0}")]
    Enumeration(String),

    /// Preparing an entry's resources failed
    #[error("Warm-up failed: {0}")]
    Warmup(String),

    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;
