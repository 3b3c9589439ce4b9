//! Search-store rebuild from the relational system of record.
//!
//! # Design principles
//!
//! - Strictly sequential: one container, one entity kind, one batch at a time
//! - Every recovery source is a verified, sequenced snapshot, never a live
//!   table, never a partial copy
//! - Cleanup on every exit path: snapshots are dropped and the replica count
//!   is restored whether a pass succeeds or raises
//! - Partial bulk failures are logged with their cause and never abort the
//!   run; there is no per-document retry
//!
//! The transformation from relational rows to documents lives in
//! [`transform`]; routing-key grouping in [`partition`].

mod engine;
mod errors;
pub mod partition;
pub mod transform;

pub use engine::{BulkRecoveryEngine, RecoveryOptions, RecoverySummary};
pub use errors::{RecoveryError, RecoveryResult, TransformError, TransformResult};
