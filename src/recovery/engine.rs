//! Checkpointed bulk rebuild of the search store.
//!
//! Containers and entity kinds are processed strictly sequentially. One
//! container's pass:
//!
//! 1. Delete the container when clearing was requested (absent is fine)
//! 2. Create the container (already-exists is tolerated only for the
//!    administrative container)
//! 3. Force the replica count to 0
//! 4. Delete the tenant's stale Cell documents from the administrative
//!    container (non-admin containers only)
//! 5. Recover each entity kind from its verified snapshot
//! 6. Refresh the container (non-admin)
//! 7. Restore the configured replica count, on success and on failure
//!
//! Bulk acknowledgments may arrive asynchronously; they are collected every
//! `check_count` batches and once more after the page loop, so none is
//! outstanding when a kind is declared complete. Partial write failures are
//! logged with their cause and never abort the run.

use tracing::{error, info};

use super::errors::RecoveryResult;
use super::partition::BulkPartitions;
use super::transform;
use crate::checkpoint::TableCheckpointer;
use crate::model::{admin_container, tenant_key, EntityKind, CELL_ROUTING_KEY};
use crate::scanner;
use crate::store::{
    BulkAck, BulkDoc, BulkTicket, RelationalStore, SearchStore, SqlSession, StoreError,
};

/// Tunables of one recovery run.
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// Container-name prefix.
    pub prefix: String,
    /// Snapshot rows per page and documents per bulk write.
    pub batch_size: usize,
    /// Bulk batches between acknowledgment checks.
    pub check_count: usize,
    /// Replica count restored when a container's pass ends.
    pub replicas: u32,
    /// Delete each container before recreating it.
    pub clear: bool,
}

/// Totals of one finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoverySummary {
    pub containers: Vec<String>,
    pub restored_rows: u64,
}

/// Streams system-of-record rows into the search store.
pub struct BulkRecoveryEngine<'a> {
    search: &'a mut dyn SearchStore,
    relational: &'a mut dyn RelationalStore,
    options: RecoveryOptions,
}

impl<'a> BulkRecoveryEngine<'a> {
    pub fn new(
        search: &'a mut dyn SearchStore,
        relational: &'a mut dyn RelationalStore,
        options: RecoveryOptions,
    ) -> Self {
        Self { search, relational, options }
    }

    /// Recover the given containers, or every prefixed database when none
    /// are given.
    pub fn run(&mut self, containers: Vec<String>) -> RecoveryResult<RecoverySummary> {
        let targets = if containers.is_empty() {
            self.list_target_databases()?
        } else {
            containers
        };

        info!(count = targets.len(), "recovery start");
        let mut summary = RecoverySummary::default();
        for (index, container) in targets.iter().enumerate() {
            info!(container = %container, "container recovery start [{}/{}]", index + 1, targets.len());
            summary.restored_rows += self.recover_container(container)?;
            summary.containers.push(container.clone());
            info!(container = %container, "container recovery end [{}/{}]", index + 1, targets.len());
        }
        info!("recovery end");
        Ok(summary)
    }

    fn list_target_databases(&mut self) -> RecoveryResult<Vec<String>> {
        let marker = format!("{}_", self.options.prefix);
        let mut databases: Vec<String> = self
            .relational
            .list_databases()?
            .into_iter()
            .filter(|name| name.starts_with(&marker))
            .collect();
        databases.sort();
        info!(?databases, "recovery target databases");
        Ok(databases)
    }

    fn recover_container(&mut self, container: &str) -> RecoveryResult<u64> {
        let is_admin = container == admin_container(&self.options.prefix);

        if self.options.clear {
            match self.search.delete_container(container) {
                Ok(()) => info!(container, "removed container"),
                Err(err) if err.is_container_missing() => {
                    info!(container, "container does not exist on the search store");
                }
                Err(err) => return Err(err.into()),
            }
        }

        match self.search.create_container(container) {
            Ok(()) => info!(container, "created container"),
            Err(StoreError::ContainerExists(_)) if is_admin => {
                // The administrative container outlives tenant rebuilds.
            }
            Err(err) => {
                error!(container, "unable to create container: it already exists or the store failed");
                return Err(err.into());
            }
        }

        // Replica suppression brackets the whole pass; the configured count
        // is restored on every exit path.
        self.search.set_replica_count(container, 0)?;
        let result = self.recover_container_inner(container, is_admin);
        let restored = self.search.set_replica_count(container, self.options.replicas);
        let rows = result?;
        restored?;
        Ok(rows)
    }

    fn recover_container_inner(&mut self, container: &str, is_admin: bool) -> RecoveryResult<u64> {
        if !is_admin {
            self.reconcile_tenant_roots(container)?;
        }

        // One relational connection per tenant database, closed when the
        // pass ends.
        let mut session = self.relational.session(Some(container))?;

        let kinds: &[EntityKind] = if is_admin {
            // The administrative database holds only cross-tenant Cell
            // records; the other kinds have no tables there.
            &[EntityKind::Cell]
        } else {
            &EntityKind::RECOVERY_ORDER
        };

        let mut rows = 0;
        for kind in kinds {
            rows += self.recover_kind(session.as_mut(), container, *kind)?;
        }

        if !is_admin {
            self.search.refresh_container(container)?;
        }
        Ok(rows)
    }

    fn recover_kind(
        &mut self,
        session: &mut dyn SqlSession,
        container: &str,
        kind: EntityKind,
    ) -> RecoveryResult<u64> {
        info!(container, kind = kind.display_name(), "kind recovery start");
        let mut checkpointer = TableCheckpointer::new(session, container);
        let total = checkpointer.source_count(kind)?;

        // The snapshot is dropped whether the page loop completes or raises.
        let result = self.snapshot_and_page(&mut checkpointer, container, kind, total);
        let dropped = checkpointer.drop_snapshot(kind);
        let rows = result?;
        dropped?;

        info!(container, kind = kind.display_name(), rows, "kind recovery end");
        Ok(rows)
    }

    fn snapshot_and_page(
        &mut self,
        checkpointer: &mut TableCheckpointer<'_>,
        container: &str,
        kind: EntityKind,
        total: u64,
    ) -> RecoveryResult<u64> {
        checkpointer.snapshot(kind, total)?;

        let admin = admin_container(&self.options.prefix);
        let batch = self.options.batch_size.max(1) as i64;
        let check_count = self.options.check_count.max(1);

        let mut tickets: Vec<BulkTicket> = Vec::new();
        let mut batches = 0usize;
        let mut restored = 0u64;
        let mut current = 0i64;

        while current < total as i64 {
            let rows = checkpointer.select_range(kind, current + 1, current + batch)?;

            let mut cells: Vec<BulkDoc> = Vec::new();
            let mut partitions = BulkPartitions::new();
            for row in &rows {
                let mapped = transform::map_row(kind, row)?;
                if kind == EntityKind::Cell {
                    cells.push(mapped.doc);
                } else {
                    partitions.push(mapped.routing, mapped.doc);
                }
            }

            // Cell documents go to the administrative container in one
            // synchronous write, never through the per-tenant bulk path.
            if !cells.is_empty() {
                let ack = self.search.bulk_write_sync(&admin, CELL_ROUTING_KEY, cells)?;
                log_partial_failures(&admin, &ack);
            }

            if !partitions.is_empty() {
                tickets.push(self.search.bulk_write(container, partitions.into_store_form())?);
            }

            restored += rows.len() as u64;
            info!(
                container,
                table = kind.snapshot_table(),
                "restored [{}/{}]",
                restored,
                total
            );

            current += batch;
            batches += 1;
            if batches % check_count == 0 {
                self.collect_acks(container, &mut tickets)?;
            }
        }

        // Nothing may stay outstanding when the kind is declared complete.
        self.collect_acks(container, &mut tickets)?;
        Ok(restored)
    }

    fn collect_acks(
        &mut self,
        container: &str,
        tickets: &mut Vec<BulkTicket>,
    ) -> RecoveryResult<()> {
        if tickets.is_empty() {
            return Ok(());
        }
        info!(container, pending = tickets.len(), "bulk response check start");
        for ticket in tickets.drain(..) {
            let ack = self.search.take_ack(ticket)?;
            log_partial_failures(container, &ack);
        }
        info!(container, "bulk response check end");
        Ok(())
    }

    /// Delete the tenant's existing Cell documents from the administrative
    /// container, so cells removed from the system of record since the last
    /// rebuild do not survive the restore.
    fn reconcile_tenant_roots(&mut self, container: &str) -> RecoveryResult<()> {
        let admin = admin_container(&self.options.prefix);
        let tenant = tenant_key(&self.options.prefix, container)
            .unwrap_or_else(|| container.to_string());

        let mut scan = scanner::open_kind_scan(
            self.search,
            EntityKind::Cell,
            container,
            &admin,
            &tenant,
            self.options.batch_size.max(1),
        )?;
        info!(container, stale_cells = scan.total(), "deleting stale cells");

        loop {
            let page = scan.next_page(self.search)?;
            if page.exhausted {
                break;
            }
            for record in page.records {
                self.search
                    .delete_document(&admin, "Cell", CELL_ROUTING_KEY, &record.id)?;
            }
        }
        scan.close(self.search);
        Ok(())
    }
}

fn log_partial_failures(container: &str, ack: &BulkAck) {
    if ack.has_failures() {
        // Best-effort with visibility: the run continues.
        error!(
            container,
            failures = %ack.failure_message(),
            "failed to recover index data on the search store"
        );
    }
}
