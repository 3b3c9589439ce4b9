//! Drift detection between the two stores.
//!
//! The reconciliation run ties the catalog, scanners, and staging
//! reconciler together: enumerate and match tenant pairs, extract both
//! sides page by page, and report every mismatch. It never mutates either
//! store beyond the truncate-per-pass staging tables.

mod errors;
mod runner;

pub use errors::{ReconcileError, ReconcileResult};
pub use runner::{run, ReconcileOptions, ReconcileReport};
