//! The reconciliation pass over every matched tenant pair.
//!
//! Order of one run:
//!
//! 1. Build the exclusion set and enumerate both stores
//! 2. Match containers against databases; any unmatched name aborts here
//! 3. Per database, per entity kind: clear staging, scan the search store,
//!    stage, diff against the source table
//! 4. Per container: walk the tenant's binary-content tree, stage it, scan
//!    the file-subtype documents, diff both staging tables
//!
//! Mismatches are logged as they are found and collected into the report;
//! they do not fail the run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::errors::ReconcileResult;
use crate::catalog;
use crate::content;
use crate::model::{admin_container, EntityKind, MismatchRecord, ReconciliationRecord, TenantContainerPair};
use crate::scanner;
use crate::staging::{StagingReconciler, StagingSide};
use crate::store::{RelationalStore, SearchStore, SqlSession, TableRef};

/// Inputs of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Container-name prefix.
    pub prefix: String,
    /// Restrict the run to one tenant.
    pub tenant: Option<String>,
    /// Page size for scans and staging chunks.
    pub page_size: usize,
    /// Root of the binary-content tree, one subdirectory per tenant.
    pub content_root: PathBuf,
    /// Optional exclusion directory; its subdirectories name parked tenants.
    pub exclusion_root: Option<PathBuf>,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pairs_checked: usize,
    pub mismatches: Vec<MismatchRecord>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Run the full reconciliation pass.
pub fn run(
    search: &mut dyn SearchStore,
    relational: &mut dyn RelationalStore,
    options: &ReconcileOptions,
) -> ReconcileResult<ReconcileReport> {
    let started_at = Utc::now();
    info!("check started");

    let exclusions =
        catalog::list_exclusions(&options.prefix, options.exclusion_root.as_deref())?;
    let containers = catalog::enumerate_containers(
        search,
        &options.prefix,
        options.tenant.as_deref(),
        &exclusions,
    )?;
    let databases = catalog::enumerate_databases(
        relational,
        &options.prefix,
        options.tenant.as_deref(),
        &exclusions,
    )?;

    // Fail fast on any unmatched name, before any comparison work.
    let pairs = catalog::match_pairs(&options.prefix, &containers, &databases)?;
    if pairs.is_empty() {
        info!("no tenants in scope");
        return Ok(ReconcileReport {
            started_at,
            finished_at: Utc::now(),
            pairs_checked: 0,
            mismatches: Vec::new(),
        });
    }

    // One relational connection for the whole run.
    let mut session = relational.session(None)?;
    let mut mismatches = Vec::new();

    for pair in &pairs {
        let Some(database) = pair.database.as_deref() else {
            continue;
        };
        info!(container = %pair.search_container, "checking container start");
        for kind in EntityKind::CHECK_ORDER {
            mismatches.extend(check_kind(
                search,
                session.as_mut(),
                pair,
                database,
                kind,
                options,
            )?);
        }
        info!(container = %pair.search_container, "checking container end");
    }

    for pair in &pairs {
        mismatches.extend(check_content(search, session.as_mut(), pair, options)?);
    }

    info!(mismatches = mismatches.len(), "check completed");
    Ok(ReconcileReport {
        started_at,
        finished_at: Utc::now(),
        pairs_checked: pairs.len(),
        mismatches,
    })
}

fn check_kind(
    search: &mut dyn SearchStore,
    session: &mut dyn SqlSession,
    pair: &TenantContainerPair,
    database: &str,
    kind: EntityKind,
    options: &ReconcileOptions,
) -> ReconcileResult<Vec<MismatchRecord>> {
    info!(
        container = %pair.search_container,
        kind = kind.display_name(),
        "checking kind start"
    );

    let mut reconciler = StagingReconciler::new(session, options.page_size);
    reconciler.clear()?;

    let admin = admin_container(&options.prefix);
    let mut scan = scanner::open_kind_scan(
        search,
        kind,
        &pair.search_container,
        &admin,
        &pair.tenant_key,
        options.page_size,
    )?;
    info!(total = scan.total(), "records in search store");

    loop {
        let page = scan.next_page(search)?;
        if page.exhausted {
            break;
        }
        if !page.records.is_empty() {
            reconciler.stage(StagingSide::Search, &page.records)?;
        }
        info!(processed = scan.processed(), total = scan.total(), "fetched records");
    }
    scan.close(search);

    let source = TableRef::new(database, kind.table_name());
    let found = reconciler.diff(
        &source,
        &StagingSide::Search.table(),
        kind,
        &pair.tenant_key,
    )?;

    info!(
        container = %pair.search_container,
        kind = kind.display_name(),
        "checking kind end"
    );
    Ok(found)
}

fn check_content(
    search: &mut dyn SearchStore,
    session: &mut dyn SqlSession,
    pair: &TenantContainerPair,
    options: &ReconcileOptions,
) -> ReconcileResult<Vec<MismatchRecord>> {
    let tenant_dir = options.content_root.join(&pair.tenant_key);
    if !tenant_dir.is_dir() {
        info!(
            container = %pair.search_container,
            path = %tenant_dir.display(),
            "no binary content directory; skipping"
        );
        return Ok(Vec::new());
    }

    info!(container = %pair.search_container, "checking binary content start");
    let files = content::walk(&tenant_dir)?;
    let records: Vec<ReconciliationRecord> = files
        .into_iter()
        .map(|(id, revision)| ReconciliationRecord::new(id, revision))
        .collect();

    let mut reconciler = StagingReconciler::new(session, options.page_size);
    reconciler.clear()?;
    if !records.is_empty() {
        reconciler.stage(StagingSide::Content, &records)?;
    }

    let mut scan =
        scanner::open_content_scan(search, &pair.search_container, options.page_size)?;
    info!(total = scan.total(), "dav resources in search store");
    loop {
        let page = scan.next_page(search)?;
        if page.exhausted {
            break;
        }
        if !page.records.is_empty() {
            reconciler.stage(StagingSide::Search, &page.records)?;
        }
        info!(
            processed = scan.processed(),
            total = scan.total(),
            skipped = page.skipped,
            "fetched dav records"
        );
    }
    scan.close(search);

    let found = reconciler.diff(
        &StagingSide::Content.table(),
        &StagingSide::Search.table(),
        EntityKind::DavNode,
        &pair.tenant_key,
    )?;
    reconciler.clear()?;

    info!(container = %pair.search_container, "checking binary content end");
    Ok(found)
}
