//! Recovery error types.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::scanner::ScannerError;
use crate::store::StoreError;

/// Result type for row transformation
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Errors raised while mapping a snapshot row to a document.
///
/// Malformed JSON in a column is not an error: the field is dropped and
/// logged. These are the row-level defects no document can be built from.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("snapshot row of {table} is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// Errors aborting a recovery run.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Scanner(#[from] ScannerError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}
