//! Error types for the library collaborators

use lumen_queue::QueueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;

impl From<LibraryError> for QueueError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Io(e) => QueueError::Io(e),
            other => QueueError::Enumeration(other.to_string()),
        }
    }
}
