//! Reconciliation run error types.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::content::ContentError;
use crate::scanner::ScannerError;
use crate::staging::StagingError;
use crate::store::StoreError;

/// Result type for reconciliation runs
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors aborting a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Scanner(#[from] ScannerError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}
