//! Parameterized statement builders for the maintenance tables.
//!
//! Every statement the reconciler executes is built here, with fixed text
//! shapes and values carried as parameters. Table and column names are part
//! of the persisted maintenance schema and must not drift.

use crate::model::ReconciliationRecord;
use crate::store::{SqlValue, Statement, TableRef};

/// `TRUNCATE TABLE` for one staging table.
pub fn truncate(table: &TableRef) -> Statement {
    Statement::new(format!("TRUNCATE TABLE {}", table.qualified()))
}

/// Multi-row `INSERT` of (id, updated) pairs.
///
/// The caller bounds the record count per statement; this builder emits one
/// placeholder pair per record.
pub fn insert_pairs(table: &TableRef, records: &[ReconciliationRecord]) -> Statement {
    let placeholders = vec!["(?, ?)"; records.len()].join(", ");
    let mut params = Vec::with_capacity(records.len() * 2);
    for record in records {
        params.push(SqlValue::Text(record.id.clone()));
        params.push(SqlValue::Int(record.revision));
    }
    Statement::with_params(
        format!(
            "INSERT INTO {} (id, updated) VALUES {}",
            table.qualified(),
            placeholders
        ),
        params,
    )
}

/// `SELECT COUNT(*)` over one table.
pub fn count(table: &TableRef) -> Statement {
    Statement::new(format!(
        "SELECT COUNT(*) AS CNT FROM {}",
        table.qualified()
    ))
}

/// Rows of `source` whose id is absent from `target`.
pub fn missing_rows(source: &TableRef, target: &TableRef) -> Statement {
    Statement::new(format!(
        "SELECT src.id, src.updated FROM {} AS src LEFT JOIN {} AS tgt USING (id) WHERE tgt.id IS NULL",
        source.qualified(),
        target.qualified()
    ))
}

/// Rows present in both tables with differing `updated` values.
///
/// Reported values are the target side's, matching what the search store
/// currently holds.
pub fn revision_mismatches(source: &TableRef, target: &TableRef) -> Statement {
    Statement::new(format!(
        "SELECT tgt.id, tgt.updated FROM {} AS src JOIN {} AS tgt USING (id) WHERE src.updated <> tgt.updated",
        source.qualified(),
        target.qualified()
    ))
}
