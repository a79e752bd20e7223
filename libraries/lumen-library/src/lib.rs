//! Lumen Library - local file collaborators
//!
//! Implementations of the queue engine's platform traits for media on the
//! local filesystem.
//!
//! # Architecture
//!
//! - `scanner`: Recursive directory scanning for media files
//! - `siblings`: Paginated folder listing for neighbor expansion
//! - `probe`: Header probing as the buffer window warm-up

mod error;

pub mod probe;
pub mod scanner;
pub mod siblings;

pub use error::{LibraryError, Result};
pub use probe::FileProbe;
pub use scanner::MediaScanner;
pub use siblings::FolderSiblings;
