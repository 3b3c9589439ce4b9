//! Store capability errors.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by either store capability.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("container not found: {0}")]
    ContainerMissing(String),

    #[error("container already exists: {0}")]
    ContainerExists(String),

    #[error("database not found: {0}")]
    DatabaseMissing(String),

    #[error("table not found: {0}")]
    TableMissing(String),

    #[error("unknown scan handle")]
    UnknownScan,

    #[error("unknown bulk ticket")]
    UnknownTicket,

    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }

    /// True when the error means the named container does not exist.
    ///
    /// Reconciliation scans and `--clear` deletion both tolerate this case.
    pub fn is_container_missing(&self) -> bool {
        matches!(self, StoreError::ContainerMissing(_))
    }
}
