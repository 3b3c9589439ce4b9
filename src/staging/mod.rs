//! Staging-based set-difference comparison.
//!
//! Scanned (id, revision) pairs are buffered into two persisted maintenance
//! tables (one per store side) and compared with three independent set
//! operations. Every pass:
//!
//! 1. Truncate both staging tables (no cross-run residue)
//! 2. Insert scanned records in bounded chunks
//! 3. Run all three mismatch queries
//!
//! For a fixed pair of staged snapshots the result multiset is
//! order-independent: the three categories are computed by separate queries
//! over committed rows.

mod errors;
pub mod queries;

pub use errors::{StagingError, StagingResult};

use tracing::{debug, info, warn};

use crate::model::{EntityKind, MismatchKind, MismatchRecord, ReconciliationRecord};
use crate::store::{SqlSession, TableRef};

/// Schema holding the reusable maintenance tables.
pub const STAGING_SCHEMA: &str = "data_check";

/// Staging table for records scanned from the search store.
pub const SEARCH_STAGING_TABLE: &str = "CHECK_ES";

/// Staging table for identifiers enumerated from the binary-content tree.
pub const CONTENT_STAGING_TABLE: &str = "CHECK_FS";

/// Which maintenance table a stage call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingSide {
    Search,
    Content,
}

impl StagingSide {
    pub fn table(self) -> TableRef {
        match self {
            StagingSide::Search => TableRef::new(STAGING_SCHEMA, SEARCH_STAGING_TABLE),
            StagingSide::Content => TableRef::new(STAGING_SCHEMA, CONTENT_STAGING_TABLE),
        }
    }
}

/// Buffers scanned records and computes mismatch sets.
pub struct StagingReconciler<'a> {
    session: &'a mut dyn SqlSession,
    chunk_size: usize,
}

impl<'a> StagingReconciler<'a> {
    /// `chunk_size` bounds the rows of one insert statement.
    pub fn new(session: &'a mut dyn SqlSession, chunk_size: usize) -> Self {
        Self { session, chunk_size: chunk_size.max(1) }
    }

    /// Truncate both maintenance tables.
    pub fn clear(&mut self) -> StagingResult<()> {
        for side in [StagingSide::Search, StagingSide::Content] {
            self.session.execute(&queries::truncate(&side.table()))?;
        }
        Ok(())
    }

    /// Insert records into one side's staging table, chunked to respect
    /// statement-size limits.
    pub fn stage(
        &mut self,
        side: StagingSide,
        records: &[ReconciliationRecord],
    ) -> StagingResult<u64> {
        let table = side.table();
        let mut inserted = 0;
        for chunk in records.chunks(self.chunk_size) {
            inserted += self.session.execute(&queries::insert_pairs(&table, chunk))?;
        }
        debug!(table = %table, inserted, "staged records");
        Ok(inserted)
    }

    /// Compute the three mismatch sets between two committed tables.
    pub fn diff(
        &mut self,
        source: &TableRef,
        target: &TableRef,
        entity_kind: EntityKind,
        tenant: &str,
    ) -> StagingResult<Vec<MismatchRecord>> {
        let mut mismatches = Vec::new();

        let passes = [
            (queries::missing_rows(source, target), MismatchKind::MissingInTarget),
            (queries::missing_rows(target, source), MismatchKind::MissingInSource),
            (queries::revision_mismatches(source, target), MismatchKind::RevisionMismatch),
        ];

        for (statement, kind) in passes {
            for record in self.session.query_records(&statement)? {
                mismatches.push(MismatchRecord {
                    id: record.id,
                    revision: record.revision,
                    entity_kind,
                    tenant: tenant.to_string(),
                    kind,
                });
            }
        }

        if mismatches.is_empty() {
            info!(source = %source, target = %target, "no mismatches");
        } else {
            warn!(
                source = %source,
                target = %target,
                count = mismatches.len(),
                "detected data mismatches"
            );
            for m in &mismatches {
                info!(
                    id = %m.id,
                    revision = m.revision,
                    tenant = %m.tenant,
                    entity_kind = m.entity_kind.display_name(),
                    kind = m.kind.as_str(),
                    "inconsistency"
                );
            }
        }

        Ok(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRelationalStore;
    use crate::store::{RelationalStore, SqlRow, SqlValue};

    fn record(id: &str, revision: i64) -> ReconciliationRecord {
        ReconciliationRecord::new(id, revision)
    }

    fn source_row(id: &str, updated: i64) -> SqlRow {
        SqlRow::new()
            .with("id", SqlValue::Text(id.to_string()))
            .with("updated", SqlValue::Int(updated))
    }

    #[test]
    fn test_stage_chunks_inserts() {
        let mut store = MemoryRelationalStore::new();
        let mut session = store.session(None).unwrap();
        let mut reconciler = StagingReconciler::new(session.as_mut(), 2);

        let records: Vec<_> = (0..5).map(|i| record(&format!("r{i}"), i)).collect();
        let inserted = reconciler.stage(StagingSide::Search, &records).unwrap();
        assert_eq!(inserted, 5);
        assert_eq!(store.row_count(STAGING_SCHEMA, SEARCH_STAGING_TABLE).unwrap(), 5);
    }

    #[test]
    fn test_clear_removes_residue_from_both_sides() {
        let mut store = MemoryRelationalStore::new();
        let mut session = store.session(None).unwrap();
        let mut reconciler = StagingReconciler::new(session.as_mut(), 100);

        reconciler.stage(StagingSide::Search, &[record("a", 1)]).unwrap();
        reconciler.stage(StagingSide::Content, &[record("b", 0)]).unwrap();
        reconciler.clear().unwrap();

        assert_eq!(store.row_count(STAGING_SCHEMA, SEARCH_STAGING_TABLE).unwrap(), 0);
        assert_eq!(store.row_count(STAGING_SCHEMA, CONTENT_STAGING_TABLE).unwrap(), 0);
    }

    #[test]
    fn test_diff_three_way_classification() {
        let mut store = MemoryRelationalStore::new();
        store.create_database("u0_acme");
        store.create_table("u0_acme", "CELL");
        store.insert_row("u0_acme", "CELL", source_row("only-src", 1)).unwrap();
        store.insert_row("u0_acme", "CELL", source_row("both-same", 5)).unwrap();
        store.insert_row("u0_acme", "CELL", source_row("both-diff", 5)).unwrap();

        let mut session = store.session(None).unwrap();
        let mut reconciler = StagingReconciler::new(session.as_mut(), 100);
        reconciler
            .stage(
                StagingSide::Search,
                &[record("both-same", 5), record("both-diff", 9), record("only-tgt", 3)],
            )
            .unwrap();

        let source = TableRef::new("u0_acme", "CELL");
        let target = StagingSide::Search.table();
        let mismatches = reconciler
            .diff(&source, &target, EntityKind::Cell, "acme")
            .unwrap();

        assert_eq!(mismatches.len(), 3);
        let by_kind = |kind: MismatchKind| -> Vec<&str> {
            mismatches
                .iter()
                .filter(|m| m.kind == kind)
                .map(|m| m.id.as_str())
                .collect()
        };
        assert_eq!(by_kind(MismatchKind::MissingInTarget), vec!["only-src"]);
        assert_eq!(by_kind(MismatchKind::MissingInSource), vec!["only-tgt"]);
        assert_eq!(by_kind(MismatchKind::RevisionMismatch), vec!["both-diff"]);
        // The categories are pairwise disjoint by construction; the mismatch
        // record carries the target-side revision.
        let diff = mismatches
            .iter()
            .find(|m| m.kind == MismatchKind::RevisionMismatch)
            .unwrap();
        assert_eq!(diff.revision, 9);
    }

    #[test]
    fn test_diff_of_identical_snapshots_is_empty() {
        let mut store = MemoryRelationalStore::new();
        let mut session = store.session(None).unwrap();
        let mut reconciler = StagingReconciler::new(session.as_mut(), 100);

        let records = [record("a", 1), record("b", 2)];
        reconciler.stage(StagingSide::Search, &records).unwrap();
        reconciler.stage(StagingSide::Content, &records).unwrap();

        let mismatches = reconciler
            .diff(
                &StagingSide::Content.table(),
                &StagingSide::Search.table(),
                EntityKind::DavNode,
                "acme",
            )
            .unwrap();
        assert!(mismatches.is_empty());
    }
}
