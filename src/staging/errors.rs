//! Staging error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Errors raised while staging or diffing scanned records.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging statement failed: {0}")]
    Store(#[from] StoreError),
}
