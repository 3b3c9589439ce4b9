//! Catalog error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while enumerating or matching tenant containers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Names present in exactly one store. Partial comparison is worse than
    /// no comparison, so any unmatched name aborts the run.
    #[error("container and database sets do not match: {0:?}")]
    Unmatched(Vec<String>),

    #[error("failed to read exclusion directory {path}: {source}")]
    ExclusionIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store enumeration failed: {0}")]
    Store(#[from] StoreError),
}
