//! Paginated extraction of (id, revision) pairs from the search store.
//!
//! Each pass owns an explicit [`Scan`] value (continuation handle, total
//! matching count, processed tally) threaded through every call and
//! destroyed when the pass ends. The total exists for progress logging only;
//! termination is decided per page:
//!
//! - ordinary scans are exhausted when the store returns a page with no hits
//! - binary-content scans skip hits whose sub-kind is not the file sub-kind,
//!   and are exhausted only when a page yields zero records **and** zero
//!   skipped entries; a skip-only page must not be mistaken for end of data
//!
//! Administrative-container Cell scans are filtered by ownership in the
//! store query and re-verified page-side against the decoded owner.

mod errors;
pub mod owner;

pub use errors::{ScannerError, ScannerResult};

use tracing::{debug, warn};

use crate::model::{
    EntityKind, ReconciliationRecord, ANONYMOUS_TENANT, DAV_FILE_SUBKIND, MISSING_REVISION,
};
use crate::store::{OwnerFilter, ScanFilter, ScanHandle, SearchHit, SearchStore};

/// One page of scan output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    pub records: Vec<ReconciliationRecord>,
    pub skipped: u64,
    pub exhausted: bool,
}

#[derive(Debug)]
enum ScanMode {
    /// Records as returned, revision from the `u` field.
    Plain,
    /// DavNode hits restricted to file nodes, revision fixed at 0.
    DavFiles,
    /// Cell hits re-verified against the decoded owner.
    CellOwner { tenant: String },
}

/// Per-pass scan state. Scoped to one (container, entity kind) pass.
#[derive(Debug)]
pub struct Scan {
    handle: Option<ScanHandle>,
    total: u64,
    processed: u64,
    mode: ScanMode,
}

impl Scan {
    /// Total matching count reported at open time (progress logging only).
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Records plus skipped entries consumed so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Fetch and classify the next page.
    pub fn next_page(&mut self, store: &mut dyn SearchStore) -> ScannerResult<ScanPage> {
        let Some(handle) = &self.handle else {
            return Ok(ScanPage { records: Vec::new(), skipped: 0, exhausted: true });
        };

        let hits = store.next_page(handle)?;
        if hits.is_empty() {
            return Ok(ScanPage { records: Vec::new(), skipped: 0, exhausted: true });
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for hit in hits {
            match &self.mode {
                ScanMode::Plain => records.push(plain_record(&hit)),
                ScanMode::DavFiles => {
                    if hit.source_str("t") == Some(DAV_FILE_SUBKIND) {
                        records.push(ReconciliationRecord::new(hit.id, 0));
                    } else {
                        skipped += 1;
                    }
                }
                ScanMode::CellOwner { tenant } => {
                    match hit.nested_str("h", "Owner") {
                        Some(raw) if owner::decode_owner(raw) != *tenant => {
                            // The store-side filter should already have
                            // excluded this hit.
                            debug!(id = %hit.id, owner = raw, "dropping foreign-owner cell");
                        }
                        _ => records.push(plain_record(&hit)),
                    }
                }
            }
        }

        self.processed += records.len() as u64 + skipped;
        Ok(ScanPage { records, skipped, exhausted: false })
    }

    /// End the pass and release store-side state.
    pub fn close(self, store: &mut dyn SearchStore) {
        if let Some(handle) = self.handle {
            store.close_scan(handle);
        }
    }
}

fn plain_record(hit: &SearchHit) -> ReconciliationRecord {
    ReconciliationRecord::new(hit.id.clone(), hit.revision.unwrap_or(MISSING_REVISION))
}

fn empty_scan(mode: ScanMode) -> Scan {
    Scan { handle: None, total: 0, processed: 0, mode }
}

fn open(
    store: &mut dyn SearchStore,
    container: &str,
    filter: &ScanFilter,
    page_size: usize,
    mode: ScanMode,
) -> ScannerResult<Scan> {
    match store.open_scan(container, filter, page_size) {
        Ok((handle, total)) => Ok(Scan { handle: Some(handle), total, processed: 0, mode }),
        Err(err) if err.is_container_missing() => {
            // The relational side may hold kinds the index never received;
            // treat the scan as empty and let the diff report them.
            warn!(container, "container missing from search store");
            Ok(empty_scan(mode))
        }
        Err(err) => Err(err.into()),
    }
}

/// Open a master-consistency scan for one entity kind.
///
/// Cell documents live in the administrative container filtered by
/// ownership; the other kinds are scanned from the tenant's own container.
pub fn open_kind_scan(
    store: &mut dyn SearchStore,
    kind: EntityKind,
    container: &str,
    admin_container: &str,
    tenant: &str,
    page_size: usize,
) -> ScannerResult<Scan> {
    match kind {
        EntityKind::Cell => {
            let filter = if tenant == ANONYMOUS_TENANT {
                OwnerFilter::Missing
            } else {
                OwnerFilter::Tenant(tenant.to_string())
            };
            open(
                store,
                admin_container,
                &ScanFilter::CellOwner(filter),
                page_size,
                ScanMode::CellOwner { tenant: tenant.to_lowercase() },
            )
        }
        EntityKind::Link => open(
            store,
            container,
            &ScanFilter::DocType("link".to_string()),
            page_size,
            ScanMode::Plain,
        ),
        EntityKind::DavNode => open(
            store,
            container,
            &ScanFilter::DocType("dav".to_string()),
            page_size,
            ScanMode::Plain,
        ),
        EntityKind::Entity => {
            // Entity documents are everything not carrying a fixed type.
            let excluded = [EntityKind::Cell, EntityKind::Link, EntityKind::DavNode]
                .iter()
                .filter_map(|k| k.fixed_doc_type())
                .map(str::to_string)
                .collect();
            open(
                store,
                container,
                &ScanFilter::ExcludeDocTypes(excluded),
                page_size,
                ScanMode::Plain,
            )
        }
    }
}

/// Open a binary-content scan: DavNode documents restricted to file nodes.
pub fn open_content_scan(
    store: &mut dyn SearchStore,
    container: &str,
    page_size: usize,
) -> ScannerResult<Scan> {
    open(
        store,
        container,
        &ScanFilter::DocType("dav".to_string()),
        page_size,
        ScanMode::DavFiles,
    )
}
