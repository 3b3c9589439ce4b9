//! CLI-specific error types.

use thiserror::Error;

use crate::lock::LockError;
use crate::reconcile::ReconcileError;
use crate::recovery::RecoveryError;
use crate::store::StoreError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced to the operator with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

impl CliError {
    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        CliError::Config(msg.into())
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        CliError::Io(msg.into())
    }
}
