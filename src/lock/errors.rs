//! Run lock error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Errors raised while acquiring the single-run lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another run already holds the lock. Not an error condition for the
    /// caller: the work is already owned.
    #[error("another instance already holds the run lock at {path}")]
    Contended { path: PathBuf },

    #[error("failed to acquire run lock at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    pub fn is_contended(&self) -> bool {
        matches!(self, LockError::Contended { .. })
    }
}
