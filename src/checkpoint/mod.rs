//! Per-entity-kind snapshot tables for checkpointed recovery.
//!
//! The relational source tables carry no column suitable for range paging,
//! so each recovery pass works from a sequenced copy. Building one must
//! follow this exact sequence:
//!
//! 1. `CREATE TABLE IF NOT EXISTS` the kind's snapshot table
//! 2. `TRUNCATE` it (an earlier run may have left rows behind)
//! 3. Copy the source table into it, assigning the sequence
//! 4. Verify the copied row count equals the source row count
//!
//! A count mismatch aborts the kind: the snapshot is an unusable partial
//! copy. The snapshot table is dropped unconditionally when the kind's pass
//! ends, whether it succeeded or raised.

mod errors;
pub mod tables;

pub use errors::{CheckpointError, CheckpointResult};

use tracing::info;

use crate::model::EntityKind;
use crate::store::{SqlRow, SqlSession};

/// Create/validate/drop/count/select-range operations over one database's
/// snapshot tables.
pub struct TableCheckpointer<'a> {
    session: &'a mut dyn SqlSession,
    database: String,
}

impl<'a> TableCheckpointer<'a> {
    pub fn new(session: &'a mut dyn SqlSession, database: impl Into<String>) -> Self {
        Self { session, database: database.into() }
    }

    /// Row count of the kind's source table.
    pub fn source_count(&mut self, kind: EntityKind) -> CheckpointResult<u64> {
        let table = tables::source_table(&self.database, kind);
        Ok(self.session.query_count(&tables::count(&table))?)
    }

    /// Row count of the kind's snapshot table.
    pub fn snapshot_count(&mut self, kind: EntityKind) -> CheckpointResult<u64> {
        let table = tables::snapshot_table(&self.database, kind);
        Ok(self.session.query_count(&tables::count(&table))?)
    }

    /// Build the kind's snapshot and verify it holds exactly `expected` rows.
    pub fn snapshot(&mut self, kind: EntityKind, expected: u64) -> CheckpointResult<()> {
        self.session.execute(&tables::create(&self.database, kind))?;
        info!(table = kind.snapshot_table(), "created snapshot table");

        self.session.execute(&tables::truncate(&self.database, kind))?;
        self.session.execute(&tables::copy(&self.database, kind))?;
        info!(table = kind.snapshot_table(), "copied snapshot table");

        let copied = self.snapshot_count(kind)?;
        if copied != expected {
            return Err(CheckpointError::CountMismatch {
                table: tables::snapshot_table(&self.database, kind).to_string(),
                expected,
                copied,
            });
        }
        Ok(())
    }

    /// One page of snapshot rows, `seq` in `[start, end]` inclusive.
    pub fn select_range(
        &mut self,
        kind: EntityKind,
        start: i64,
        end: i64,
    ) -> CheckpointResult<Vec<SqlRow>> {
        Ok(self
            .session
            .query_rows(&tables::select_range(&self.database, kind, start, end))?)
    }

    /// Drop the kind's snapshot table. Safe to call whether or not it exists.
    pub fn drop_snapshot(&mut self, kind: EntityKind) -> CheckpointResult<()> {
        self.session.execute(&tables::drop(&self.database, kind))?;
        info!(table = kind.snapshot_table(), "dropped snapshot table");
        Ok(())
    }
}
