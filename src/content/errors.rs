//! Content scanner error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for content-tree operations
pub type ContentResult<T> = Result<T, ContentError>;

/// Errors raised while walking the binary-content tree.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
