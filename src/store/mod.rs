//! Store capabilities for the two sides of the platform.
//!
//! The engine talks to abstract capabilities only:
//!
//! - [`SearchStore`]: paginated scans, bulk writes with deferred
//!   acknowledgments, container-level operations
//! - [`RelationalStore`] / [`SqlSession`]: DDL/DML execution over
//!   parameterized statements
//!
//! Network client implementations are deployment concerns and live outside
//! this crate; [`connect`] is the seam where a deployment build resolves
//! them. The in-memory implementations in [`memory`] are complete and back
//! the test suite.

mod errors;
pub mod memory;
mod relational;
mod search;

pub use errors::{StoreError, StoreResult};
pub use relational::{RelationalStore, SqlRow, SqlSession, SqlValue, Statement, TableRef};
pub use search::{
    BulkAck, BulkDoc, BulkFailure, BulkTicket, JsonMap, OwnerFilter, ScanFilter, ScanHandle,
    SearchHit, SearchStore,
};

/// Connection coordinates of the search store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoint {
    pub hosts: String,
    pub cluster_name: String,
}

/// Connection coordinates of the relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalEndpoint {
    pub url: String,
    pub user: String,
    pub password: String,
}

/// Resolve the deployment's store clients.
///
/// The clients themselves are linked by the deployment build; this build
/// carries none, so resolution reports a backend error. Everything above
/// this seam (validation, locking, the engines) is exercised against the
/// [`memory`] implementations.
pub fn connect(
    search: &SearchEndpoint,
    relational: &RelationalEndpoint,
) -> StoreResult<(Box<dyn SearchStore>, Box<dyn RelationalStore>)> {
    let _ = (search, relational);
    Err(StoreError::backend(
        "no store client implementations are linked into this build",
    ))
}
