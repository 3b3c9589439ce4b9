//! Scanner error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for scan operations
pub type ScannerResult<T> = Result<T, ScannerError>;

/// Errors raised during a paginated scan pass.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("scan failed: {0}")]
    Store(#[from] StoreError),
}
