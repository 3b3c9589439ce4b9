//! Set-algebra invariants of the three-way diff.
//!
//! For staged snapshots A (source) and B (target):
//! - diff(A, A) is empty
//! - the three categories are pairwise disjoint
//! - missing-in-target ∪ missing-in-source equals the symmetric difference
//!   of the id sets
//! - revision mismatches cover exactly the ids present in both sides with
//!   differing revisions

use std::collections::BTreeSet;

use driftsync::model::{EntityKind, MismatchKind, ReconciliationRecord};
use driftsync::staging::{StagingReconciler, StagingSide};
use driftsync::store::memory::MemoryRelationalStore;
use driftsync::store::RelationalStore;

fn record(id: &str, revision: i64) -> ReconciliationRecord {
    ReconciliationRecord::new(id, revision)
}

fn diff_staged(
    source: &[ReconciliationRecord],
    target: &[ReconciliationRecord],
) -> Vec<driftsync::model::MismatchRecord> {
    let mut store = MemoryRelationalStore::new();
    let mut session = store.session(None).unwrap();
    let mut reconciler = StagingReconciler::new(session.as_mut(), 3);
    reconciler.clear().unwrap();
    reconciler.stage(StagingSide::Content, source).unwrap();
    reconciler.stage(StagingSide::Search, target).unwrap();
    reconciler
        .diff(
            &StagingSide::Content.table(),
            &StagingSide::Search.table(),
            EntityKind::Entity,
            "acme",
        )
        .unwrap()
}

#[test]
fn test_diff_of_a_snapshot_with_itself_is_empty() {
    let snapshot: Vec<_> = (0..10).map(|i| record(&format!("id{i}"), i * 7)).collect();
    assert!(diff_staged(&snapshot, &snapshot).is_empty());
}

#[test]
fn test_categories_partition_the_differences() {
    let source = vec![
        record("src-only-1", 1),
        record("src-only-2", 2),
        record("same-1", 10),
        record("same-2", 20),
        record("diff-1", 30),
        record("diff-2", 40),
    ];
    let target = vec![
        record("tgt-only-1", 3),
        record("same-1", 10),
        record("same-2", 20),
        record("diff-1", 31),
        record("diff-2", 41),
    ];

    let mismatches = diff_staged(&source, &target);

    let by_kind = |kind: MismatchKind| -> BTreeSet<String> {
        mismatches
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.id.clone())
            .collect()
    };
    let missing_in_target = by_kind(MismatchKind::MissingInTarget);
    let missing_in_source = by_kind(MismatchKind::MissingInSource);
    let revision_mismatch = by_kind(MismatchKind::RevisionMismatch);

    // Pairwise disjoint.
    assert!(missing_in_target.is_disjoint(&missing_in_source));
    assert!(missing_in_target.is_disjoint(&revision_mismatch));
    assert!(missing_in_source.is_disjoint(&revision_mismatch));

    // Missing sets together are exactly the symmetric difference of ids.
    let source_ids: BTreeSet<String> = source.iter().map(|r| r.id.clone()).collect();
    let target_ids: BTreeSet<String> = target.iter().map(|r| r.id.clone()).collect();
    let symmetric: BTreeSet<String> = source_ids
        .symmetric_difference(&target_ids)
        .cloned()
        .collect();
    let missing_union: BTreeSet<String> =
        missing_in_target.union(&missing_in_source).cloned().collect();
    assert_eq!(missing_union, symmetric);

    // Revision mismatches are exactly the shared ids with differing values.
    let expected: BTreeSet<String> =
        ["diff-1".to_string(), "diff-2".to_string()].into_iter().collect();
    assert_eq!(revision_mismatch, expected);
}

#[test]
fn test_result_is_stable_across_staging_order() {
    let source = vec![record("a", 1), record("b", 2), record("c", 3)];
    let target = vec![record("c", 9), record("b", 2), record("d", 4)];

    let forward = diff_staged(&source, &target);

    let mut source_reversed = source.clone();
    source_reversed.reverse();
    let mut target_reversed = target.clone();
    target_reversed.reverse();
    let reversed = diff_staged(&source_reversed, &target_reversed);

    let as_set = |mismatches: &[driftsync::model::MismatchRecord]| -> BTreeSet<(String, MismatchKind)> {
        mismatches.iter().map(|m| (m.id.clone(), m.kind)).collect()
    };
    assert_eq!(as_set(&forward), as_set(&reversed));
}
