//! Checkpoint error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Errors raised while building or using snapshot tables.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The copied row count does not match the source table. A silent
    /// partial copy must never be used as a recovery source.
    #[error("snapshot count mismatch for {table}: source={expected}, copied={copied}")]
    CountMismatch {
        table: String,
        expected: u64,
        copied: u64,
    },

    #[error("checkpoint statement failed: {0}")]
    Store(#[from] StoreError),
}
