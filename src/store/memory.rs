//! Deterministic in-memory implementations of both store capabilities.
//!
//! These back the test suite the way a real deployment backs the traits with
//! network clients. The relational side interprets exactly the statement
//! shapes the builders in this crate emit (recognized by pattern, parameters
//! carried out-of-band); anything else is rejected as unsupported rather than
//! silently ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::relational::{RelationalStore, SqlRow, SqlSession, SqlValue, Statement, TableRef};
use super::search::{
    BulkAck, BulkDoc, BulkFailure, BulkTicket, JsonMap, OwnerFilter, ScanFilter, ScanHandle,
    SearchHit, SearchStore,
};
use crate::model::ReconciliationRecord;
use crate::staging::{CONTENT_STAGING_TABLE, SEARCH_STAGING_TABLE, STAGING_SCHEMA};

// ---------------------------------------------------------------------------
// Search store
// ---------------------------------------------------------------------------

/// One stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub doc_type: String,
    pub routing: String,
    pub body: JsonMap,
}

#[derive(Debug, Default)]
struct MemoryContainer {
    docs: BTreeMap<String, StoredDoc>,
    replicas: u32,
    refreshes: u64,
}

#[derive(Debug)]
struct MemoryScan {
    pages: Vec<Vec<SearchHit>>,
    next: usize,
}

/// In-memory [`SearchStore`].
#[derive(Debug, Default)]
pub struct MemorySearchStore {
    containers: BTreeMap<String, MemoryContainer>,
    scans: BTreeMap<u64, MemoryScan>,
    next_scan: u64,
    acks: BTreeMap<u64, BulkAck>,
    next_ticket: u64,
    fail_ids: BTreeSet<String>,
}

impl MemorySearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container directly (fixture setup).
    pub fn add_container(&mut self, name: &str) {
        self.containers.entry(name.to_string()).or_default();
    }

    /// Insert a document directly (fixture setup).
    pub fn insert_doc(
        &mut self,
        container: &str,
        id: &str,
        doc_type: &str,
        routing: &str,
        body: JsonMap,
    ) -> StoreResult<()> {
        let c = self
            .containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerMissing(container.to_string()))?;
        c.docs.insert(
            id.to_string(),
            StoredDoc {
                doc_type: doc_type.to_string(),
                routing: routing.to_string(),
                body,
            },
        );
        Ok(())
    }

    pub fn doc(&self, container: &str, id: &str) -> Option<StoredDoc> {
        self.containers.get(container)?.docs.get(id).cloned()
    }

    pub fn doc_count(&self, container: &str) -> usize {
        self.containers.get(container).map_or(0, |c| c.docs.len())
    }

    pub fn replica_count(&self, container: &str) -> Option<u32> {
        self.containers.get(container).map(|c| c.replicas)
    }

    pub fn refresh_count(&self, container: &str) -> u64 {
        self.containers.get(container).map_or(0, |c| c.refreshes)
    }

    /// Make future bulk writes of this id report a per-document failure.
    pub fn fail_bulk_writes_for(&mut self, id: &str) {
        self.fail_ids.insert(id.to_string());
    }

    /// Number of acknowledgments submitted but not yet collected.
    pub fn outstanding_acks(&self) -> usize {
        self.acks.len()
    }

    fn matches(filter: &ScanFilter, doc: &StoredDoc) -> bool {
        match filter {
            ScanFilter::DocType(t) => doc.doc_type == *t,
            ScanFilter::ExcludeDocTypes(types) => !types.iter().any(|t| *t == doc.doc_type),
            ScanFilter::CellOwner(owner) => {
                if doc.doc_type != "Cell" {
                    return false;
                }
                let stored = doc
                    .body
                    .get("h")
                    .and_then(Value::as_object)
                    .and_then(|h| h.get("Owner"))
                    .and_then(Value::as_str);
                match owner {
                    OwnerFilter::Missing => stored.is_none(),
                    OwnerFilter::Tenant(tenant) => stored.map_or(false, |o| {
                        o == tenant || o.ends_with(&format!("#{}", tenant))
                    }),
                }
            }
        }
    }

    fn apply_bulk(&mut self, container: &str, routing: &str, docs: Vec<BulkDoc>) -> Vec<BulkFailure> {
        let mut failures = Vec::new();
        for doc in docs {
            if self.fail_ids.contains(&doc.id) {
                failures.push(BulkFailure {
                    id: doc.id,
                    reason: "rejected by store".to_string(),
                });
                continue;
            }
            if let Some(c) = self.containers.get_mut(container) {
                c.docs.insert(
                    doc.id,
                    StoredDoc {
                        doc_type: doc.doc_type,
                        routing: routing.to_string(),
                        body: doc.body,
                    },
                );
            }
        }
        failures
    }
}

impl SearchStore for MemorySearchStore {
    fn list_containers(&mut self) -> StoreResult<Vec<String>> {
        Ok(self.containers.keys().cloned().collect())
    }

    fn create_container(&mut self, name: &str) -> StoreResult<()> {
        if self.containers.contains_key(name) {
            return Err(StoreError::ContainerExists(name.to_string()));
        }
        self.containers.insert(name.to_string(), MemoryContainer::default());
        Ok(())
    }

    fn delete_container(&mut self, name: &str) -> StoreResult<()> {
        self.containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::ContainerMissing(name.to_string()))
    }

    fn set_replica_count(&mut self, container: &str, replicas: u32) -> StoreResult<()> {
        let c = self
            .containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerMissing(container.to_string()))?;
        c.replicas = replicas;
        Ok(())
    }

    fn refresh_container(&mut self, container: &str) -> StoreResult<()> {
        let c = self
            .containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerMissing(container.to_string()))?;
        c.refreshes += 1;
        Ok(())
    }

    fn open_scan(
        &mut self,
        container: &str,
        filter: &ScanFilter,
        page_size: usize,
    ) -> StoreResult<(ScanHandle, u64)> {
        let c = self
            .containers
            .get(container)
            .ok_or_else(|| StoreError::ContainerMissing(container.to_string()))?;

        let hits: Vec<SearchHit> = c
            .docs
            .iter()
            .filter(|(_, doc)| Self::matches(filter, doc))
            .map(|(id, doc)| SearchHit {
                id: id.clone(),
                revision: doc.body.get("u").and_then(Value::as_i64),
                source: doc.body.clone(),
            })
            .collect();

        let total = hits.len() as u64;
        let size = page_size.max(1);
        let pages: Vec<Vec<SearchHit>> = hits.chunks(size).map(<[SearchHit]>::to_vec).collect();

        let handle = self.next_scan;
        self.next_scan += 1;
        self.scans.insert(handle, MemoryScan { pages, next: 0 });
        Ok((ScanHandle(handle), total))
    }

    fn next_page(&mut self, handle: &ScanHandle) -> StoreResult<Vec<SearchHit>> {
        let scan = self.scans.get_mut(&handle.0).ok_or(StoreError::UnknownScan)?;
        if scan.next >= scan.pages.len() {
            return Ok(Vec::new());
        }
        let page = scan.pages[scan.next].clone();
        scan.next += 1;
        Ok(page)
    }

    fn close_scan(&mut self, handle: ScanHandle) {
        self.scans.remove(&handle.0);
    }

    fn bulk_write(
        &mut self,
        container: &str,
        partitions: Vec<(String, Vec<BulkDoc>)>,
    ) -> StoreResult<BulkTicket> {
        if !self.containers.contains_key(container) {
            return Err(StoreError::ContainerMissing(container.to_string()));
        }
        let mut failures = Vec::new();
        for (routing, docs) in partitions {
            failures.extend(self.apply_bulk(container, &routing, docs));
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.acks.insert(ticket, BulkAck { failures });
        Ok(BulkTicket(ticket))
    }

    fn bulk_write_sync(
        &mut self,
        container: &str,
        routing: &str,
        docs: Vec<BulkDoc>,
    ) -> StoreResult<BulkAck> {
        if !self.containers.contains_key(container) {
            return Err(StoreError::ContainerMissing(container.to_string()));
        }
        let failures = self.apply_bulk(container, routing, docs);
        Ok(BulkAck { failures })
    }

    fn take_ack(&mut self, ticket: BulkTicket) -> StoreResult<BulkAck> {
        self.acks.remove(&ticket.0).ok_or(StoreError::UnknownTicket)
    }

    fn delete_document(
        &mut self,
        container: &str,
        _doc_type: &str,
        _routing: &str,
        id: &str,
    ) -> StoreResult<()> {
        let c = self
            .containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerMissing(container.to_string()))?;
        c.docs.remove(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Relational store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemTable {
    next_seq: i64,
    rows: Vec<SqlRow>,
}

#[derive(Debug, Default)]
struct RelState {
    databases: BTreeMap<String, BTreeMap<String, MemTable>>,
}

impl RelState {
    fn table_mut(&mut self, table: &TableRef) -> StoreResult<&mut MemTable> {
        self.databases
            .get_mut(&table.database)
            .ok_or_else(|| StoreError::DatabaseMissing(table.database.clone()))?
            .get_mut(&table.table)
            .ok_or_else(|| StoreError::TableMissing(table.to_string()))
    }

    fn table(&self, table: &TableRef) -> StoreResult<&MemTable> {
        self.databases
            .get(&table.database)
            .ok_or_else(|| StoreError::DatabaseMissing(table.database.clone()))?
            .get(&table.table)
            .ok_or_else(|| StoreError::TableMissing(table.to_string()))
    }
}

/// In-memory [`RelationalStore`].
#[derive(Debug, Clone)]
pub struct MemoryRelationalStore {
    state: Arc<Mutex<RelState>>,
}

impl Default for MemoryRelationalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelationalStore {
    /// A fresh store carrying the persisted maintenance tables.
    pub fn new() -> Self {
        let store = Self { state: Arc::new(Mutex::new(RelState::default())) };
        store.create_database(STAGING_SCHEMA);
        store.create_table(STAGING_SCHEMA, SEARCH_STAGING_TABLE);
        store.create_table(STAGING_SCHEMA, CONTENT_STAGING_TABLE);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RelState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn create_database(&self, name: &str) {
        self.lock().databases.entry(name.to_string()).or_default();
    }

    pub fn create_table(&self, database: &str, table: &str) {
        self.lock()
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();
    }

    pub fn insert_row(&self, database: &str, table: &str, row: SqlRow) -> StoreResult<()> {
        let mut state = self.lock();
        let t = state.table_mut(&TableRef::new(database, table))?;
        t.rows.push(row);
        Ok(())
    }

    pub fn rows(&self, database: &str, table: &str) -> StoreResult<Vec<SqlRow>> {
        Ok(self.lock().table(&TableRef::new(database, table))?.rows.clone())
    }

    pub fn row_count(&self, database: &str, table: &str) -> StoreResult<usize> {
        Ok(self.lock().table(&TableRef::new(database, table))?.rows.len())
    }

    pub fn table_exists(&self, database: &str, table: &str) -> bool {
        self.lock()
            .databases
            .get(database)
            .map_or(false, |db| db.contains_key(table))
    }
}

impl RelationalStore for MemoryRelationalStore {
    fn list_databases(&mut self) -> StoreResult<Vec<String>> {
        Ok(self.lock().databases.keys().cloned().collect())
    }

    fn session(&mut self, database: Option<&str>) -> StoreResult<Box<dyn SqlSession>> {
        if let Some(name) = database {
            if !self.lock().databases.contains_key(name) {
                return Err(StoreError::DatabaseMissing(name.to_string()));
            }
        }
        Ok(Box::new(MemorySession { state: Arc::clone(&self.state) }))
    }
}

/// One open session against a [`MemoryRelationalStore`].
///
/// Statements are schema-qualified, so the session itself carries no database
/// binding beyond the existence check at open time.
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<Mutex<RelState>>,
}

enum Parsed {
    Truncate(TableRef),
    InsertPairs(TableRef),
    Count(TableRef),
    Create(TableRef),
    Copy { dst: TableRef, cols: Vec<String>, src: TableRef },
    Drop(TableRef),
    SelectRange(TableRef),
    AntiJoin { source: TableRef, target: TableRef },
    RevisionDiff { source: TableRef, target: TableRef },
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern"))
}

fn table_ref(caps: &regex::Captures<'_>, first: usize) -> TableRef {
    TableRef::new(&caps[first], &caps[first + 1])
}

fn parse(sql: &str) -> Option<Parsed> {
    static TRUNCATE: OnceLock<Regex> = OnceLock::new();
    static INSERT: OnceLock<Regex> = OnceLock::new();
    static COUNT: OnceLock<Regex> = OnceLock::new();
    static CREATE: OnceLock<Regex> = OnceLock::new();
    static COPY: OnceLock<Regex> = OnceLock::new();
    static DROP: OnceLock<Regex> = OnceLock::new();
    static RANGE: OnceLock<Regex> = OnceLock::new();
    static ANTI: OnceLock<Regex> = OnceLock::new();
    static DIFF: OnceLock<Regex> = OnceLock::new();

    let qualified = r"`([^`]+)`\.`([^`]+)`";

    if let Some(caps) = regex(
        &TRUNCATE,
        &format!(r"^TRUNCATE TABLE {qualified}$"),
    )
    .captures(sql)
    {
        return Some(Parsed::Truncate(table_ref(&caps, 1)));
    }
    if let Some(caps) = regex(
        &INSERT,
        &format!(r"^INSERT INTO {qualified} \(id, updated\) VALUES \(\?, \?\)(?:, \(\?, \?\))*$"),
    )
    .captures(sql)
    {
        return Some(Parsed::InsertPairs(table_ref(&caps, 1)));
    }
    if let Some(caps) = regex(
        &COUNT,
        &format!(r"^SELECT COUNT\(\*\) AS CNT FROM {qualified}$"),
    )
    .captures(sql)
    {
        return Some(Parsed::Count(table_ref(&caps, 1)));
    }
    if let Some(caps) = regex(
        &CREATE,
        &format!(r"(?s)^CREATE TABLE IF NOT EXISTS {qualified} \(.*$"),
    )
    .captures(sql)
    {
        return Some(Parsed::Create(table_ref(&caps, 1)));
    }
    if let Some(caps) = regex(
        &COPY,
        &format!(r"^INSERT INTO {qualified} SELECT NULL,([a-z0-9_,]+) FROM {qualified}$"),
    )
    .captures(sql)
    {
        return Some(Parsed::Copy {
            dst: table_ref(&caps, 1),
            cols: caps[3].split(',').map(str::to_string).collect(),
            src: table_ref(&caps, 4),
        });
    }
    if let Some(caps) = regex(
        &DROP,
        &format!(r"^DROP TABLE IF EXISTS {qualified}$"),
    )
    .captures(sql)
    {
        return Some(Parsed::Drop(table_ref(&caps, 1)));
    }
    if let Some(caps) = regex(
        &RANGE,
        &format!(r"^SELECT \* FROM {qualified} WHERE seq BETWEEN \? AND \?$"),
    )
    .captures(sql)
    {
        return Some(Parsed::SelectRange(table_ref(&caps, 1)));
    }
    if let Some(caps) = regex(
        &ANTI,
        &format!(
            r"^SELECT src\.id, src\.updated FROM {qualified} AS src LEFT JOIN {qualified} AS tgt USING \(id\) WHERE tgt\.id IS NULL$"
        ),
    )
    .captures(sql)
    {
        return Some(Parsed::AntiJoin {
            source: table_ref(&caps, 1),
            target: table_ref(&caps, 3),
        });
    }
    if let Some(caps) = regex(
        &DIFF,
        &format!(
            r"^SELECT tgt\.id, tgt\.updated FROM {qualified} AS src JOIN {qualified} AS tgt USING \(id\) WHERE src\.updated <> tgt\.updated$"
        ),
    )
    .captures(sql)
    {
        return Some(Parsed::RevisionDiff {
            source: table_ref(&caps, 1),
            target: table_ref(&caps, 3),
        });
    }
    None
}

fn record_of(row: &SqlRow) -> ReconciliationRecord {
    ReconciliationRecord::new(
        row.text("id").unwrap_or_default(),
        row.int("updated").unwrap_or(0),
    )
}

impl MemorySession {
    fn lock(&self) -> std::sync::MutexGuard<'_, RelState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SqlSession for MemorySession {
    fn execute(&mut self, statement: &Statement) -> StoreResult<u64> {
        let parsed = parse(&statement.sql)
            .ok_or_else(|| StoreError::UnsupportedStatement(statement.sql.clone()))?;
        let mut state = self.lock();
        match parsed {
            Parsed::Truncate(table) => {
                let t = state.table_mut(&table)?;
                let n = t.rows.len() as u64;
                t.rows.clear();
                t.next_seq = 0;
                Ok(n)
            }
            Parsed::InsertPairs(table) => {
                let t = state.table_mut(&table)?;
                let mut inserted = 0;
                for pair in statement.params.chunks(2) {
                    let mut row = SqlRow::new();
                    row.set("id", pair[0].clone());
                    row.set("updated", pair.get(1).cloned().unwrap_or(SqlValue::Null));
                    t.rows.push(row);
                    inserted += 1;
                }
                Ok(inserted)
            }
            Parsed::Create(table) => {
                state
                    .databases
                    .get_mut(&table.database)
                    .ok_or_else(|| StoreError::DatabaseMissing(table.database.clone()))?
                    .entry(table.table.clone())
                    .or_default();
                Ok(0)
            }
            Parsed::Copy { dst, cols, src } => {
                let src_rows = state.table(&src)?.rows.clone();
                let t = state.table_mut(&dst)?;
                for row in &src_rows {
                    t.next_seq += 1;
                    let mut copied = SqlRow::new();
                    copied.set("seq", SqlValue::Int(t.next_seq));
                    for col in &cols {
                        copied.set(col.clone(), row.get(col).cloned().unwrap_or(SqlValue::Null));
                    }
                    t.rows.push(copied);
                }
                Ok(src_rows.len() as u64)
            }
            Parsed::Drop(table) => {
                if let Some(db) = state.databases.get_mut(&table.database) {
                    db.remove(&table.table);
                }
                Ok(0)
            }
            _ => Err(StoreError::UnsupportedStatement(statement.sql.clone())),
        }
    }

    fn query_count(&mut self, statement: &Statement) -> StoreResult<u64> {
        match parse(&statement.sql) {
            Some(Parsed::Count(table)) => Ok(self.lock().table(&table)?.rows.len() as u64),
            _ => Err(StoreError::UnsupportedStatement(statement.sql.clone())),
        }
    }

    fn query_records(&mut self, statement: &Statement) -> StoreResult<Vec<ReconciliationRecord>> {
        let parsed = parse(&statement.sql)
            .ok_or_else(|| StoreError::UnsupportedStatement(statement.sql.clone()))?;
        let state = self.lock();
        match parsed {
            Parsed::AntiJoin { source, target } => {
                let target_ids: BTreeSet<String> = state
                    .table(&target)?
                    .rows
                    .iter()
                    .filter_map(|r| r.text("id").map(str::to_string))
                    .collect();
                Ok(state
                    .table(&source)?
                    .rows
                    .iter()
                    .filter(|r| r.text("id").map_or(false, |id| !target_ids.contains(id)))
                    .map(record_of)
                    .collect())
            }
            Parsed::RevisionDiff { source, target } => {
                let source_revs: BTreeMap<String, i64> = state
                    .table(&source)?
                    .rows
                    .iter()
                    .filter_map(|r| {
                        r.text("id")
                            .map(|id| (id.to_string(), r.int("updated").unwrap_or(0)))
                    })
                    .collect();
                Ok(state
                    .table(&target)?
                    .rows
                    .iter()
                    .filter(|r| {
                        r.text("id").map_or(false, |id| {
                            source_revs
                                .get(id)
                                .map_or(false, |rev| *rev != r.int("updated").unwrap_or(0))
                        })
                    })
                    .map(record_of)
                    .collect())
            }
            _ => Err(StoreError::UnsupportedStatement(statement.sql.clone())),
        }
    }

    fn query_rows(&mut self, statement: &Statement) -> StoreResult<Vec<SqlRow>> {
        match parse(&statement.sql) {
            Some(Parsed::SelectRange(table)) => {
                let start = statement.params.first().and_then(SqlValue::as_int).ok_or_else(
                    || StoreError::backend("seq range start parameter missing"),
                )?;
                let end = statement.params.get(1).and_then(SqlValue::as_int).ok_or_else(
                    || StoreError::backend("seq range end parameter missing"),
                )?;
                Ok(self
                    .lock()
                    .table(&table)?
                    .rows
                    .iter()
                    .filter(|r| r.int("seq").map_or(false, |seq| seq >= start && seq <= end))
                    .cloned()
                    .collect())
            }
            _ => Err(StoreError::UnsupportedStatement(statement.sql.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, updated: i64) -> SqlRow {
        SqlRow::new()
            .with("id", SqlValue::Text(id.to_string()))
            .with("updated", SqlValue::Int(updated))
    }

    fn cell_body(owner: Option<&str>, updated: i64) -> JsonMap {
        let mut body = JsonMap::new();
        body.insert("u".to_string(), json!(updated));
        let mut hidden = JsonMap::new();
        if let Some(owner) = owner {
            hidden.insert("Owner".to_string(), json!(owner));
        }
        body.insert("h".to_string(), Value::Object(hidden));
        body
    }

    #[test]
    fn test_scan_pages_are_bounded_and_drain() {
        let mut store = MemorySearchStore::new();
        store.add_container("u0_acme");
        for i in 0..5 {
            store
                .insert_doc("u0_acme", &format!("d{i}"), "dav", "c1", JsonMap::new())
                .unwrap();
        }

        let (handle, total) = store
            .open_scan("u0_acme", &ScanFilter::DocType("dav".to_string()), 2)
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(store.next_page(&handle).unwrap().len(), 2);
        assert_eq!(store.next_page(&handle).unwrap().len(), 2);
        assert_eq!(store.next_page(&handle).unwrap().len(), 1);
        assert!(store.next_page(&handle).unwrap().is_empty());
        store.close_scan(handle);
    }

    #[test]
    fn test_owner_filter_matches_encoded_and_missing() {
        let mut store = MemorySearchStore::new();
        store.add_container("u0_ad");
        store
            .insert_doc("u0_ad", "c1", "Cell", "r", cell_body(Some("https://unit/#acme"), 1))
            .unwrap();
        store
            .insert_doc("u0_ad", "c2", "Cell", "r", cell_body(None, 2))
            .unwrap();

        let (h, total) = store
            .open_scan(
                "u0_ad",
                &ScanFilter::CellOwner(OwnerFilter::Tenant("acme".to_string())),
                10,
            )
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(store.next_page(&h).unwrap()[0].id, "c1");
        store.close_scan(h);

        let (h, total) = store
            .open_scan("u0_ad", &ScanFilter::CellOwner(OwnerFilter::Missing), 10)
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(store.next_page(&h).unwrap()[0].id, "c2");
        store.close_scan(h);
    }

    #[test]
    fn test_bulk_ack_lifecycle() {
        let mut store = MemorySearchStore::new();
        store.add_container("u0_acme");
        store.fail_bulk_writes_for("bad");

        let docs = vec![
            BulkDoc { id: "ok".to_string(), doc_type: "link".to_string(), body: JsonMap::new() },
            BulkDoc { id: "bad".to_string(), doc_type: "link".to_string(), body: JsonMap::new() },
        ];
        let ticket = store
            .bulk_write("u0_acme", vec![("c1".to_string(), docs)])
            .unwrap();
        assert_eq!(store.outstanding_acks(), 1);

        let ack = store.take_ack(ticket).unwrap();
        assert_eq!(store.outstanding_acks(), 0);
        assert!(ack.has_failures());
        assert_eq!(ack.failures[0].id, "bad");
        assert!(store.doc("u0_acme", "ok").is_some());
        assert!(store.doc("u0_acme", "bad").is_none());
    }

    #[test]
    fn test_statement_interpreter_round_trip() {
        let mut store = MemoryRelationalStore::new();
        store.create_database("u0_acme");
        store.create_table("u0_acme", "CELL");
        store.insert_row("u0_acme", "CELL", row("a", 10)).unwrap();
        store.insert_row("u0_acme", "CELL", row("b", 20)).unwrap();

        let mut session = store.session(None).unwrap();

        let count = session
            .query_count(&Statement::new("SELECT COUNT(*) AS CNT FROM `u0_acme`.`CELL`"))
            .unwrap();
        assert_eq!(count, 2);

        session
            .execute(&Statement::new(
                "CREATE TABLE IF NOT EXISTS `u0_acme`.`CELL_COPIED` (`seq` bigint not null auto_increment)",
            ))
            .unwrap();
        session
            .execute(&Statement::new(
                "INSERT INTO `u0_acme`.`CELL_COPIED` SELECT NULL,id,updated FROM `u0_acme`.`CELL`",
            ))
            .unwrap();

        let rows = session
            .query_rows(&Statement::with_params(
                "SELECT * FROM `u0_acme`.`CELL_COPIED` WHERE seq BETWEEN ? AND ?",
                vec![SqlValue::Int(1), SqlValue::Int(1)],
            ))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("id"), Some("a"));

        session
            .execute(&Statement::new("DROP TABLE IF EXISTS `u0_acme`.`CELL_COPIED`"))
            .unwrap();
        assert!(!store.table_exists("u0_acme", "CELL_COPIED"));
    }

    #[test]
    fn test_truncate_resets_sequence() {
        let mut store = MemoryRelationalStore::new();
        store.create_database("db");
        store.create_table("db", "SRC");
        store.create_table("db", "SRC_COPIED");
        store.insert_row("db", "SRC", row("x", 1)).unwrap();

        let mut session = store.session(None).unwrap();
        session
            .execute(&Statement::new("INSERT INTO `db`.`SRC_COPIED` SELECT NULL,id,updated FROM `db`.`SRC`"))
            .unwrap();
        session
            .execute(&Statement::new("TRUNCATE TABLE `db`.`SRC_COPIED`"))
            .unwrap();
        session
            .execute(&Statement::new("INSERT INTO `db`.`SRC_COPIED` SELECT NULL,id,updated FROM `db`.`SRC`"))
            .unwrap();

        let rows = store.rows("db", "SRC_COPIED").unwrap();
        assert_eq!(rows[0].int("seq"), Some(1));
    }

    #[test]
    fn test_anti_join_and_revision_diff() {
        let mut store = MemoryRelationalStore::new();
        store.create_database("db");
        store.create_table("db", "A");
        store.create_table("db", "B");
        store.insert_row("db", "A", row("only-a", 1)).unwrap();
        store.insert_row("db", "A", row("both", 5)).unwrap();
        store.insert_row("db", "B", row("both", 7)).unwrap();
        store.insert_row("db", "B", row("only-b", 2)).unwrap();

        let mut session = store.session(None).unwrap();
        let missing = session
            .query_records(&Statement::new(
                "SELECT src.id, src.updated FROM `db`.`A` AS src LEFT JOIN `db`.`B` AS tgt USING (id) WHERE tgt.id IS NULL",
            ))
            .unwrap();
        assert_eq!(missing, vec![ReconciliationRecord::new("only-a", 1)]);

        let diff = session
            .query_records(&Statement::new(
                "SELECT tgt.id, tgt.updated FROM `db`.`A` AS src JOIN `db`.`B` AS tgt USING (id) WHERE src.updated <> tgt.updated",
            ))
            .unwrap();
        assert_eq!(diff, vec![ReconciliationRecord::new("both", 7)]);
    }

    #[test]
    fn test_unknown_statement_is_rejected() {
        let mut store = MemoryRelationalStore::new();
        let mut session = store.session(None).unwrap();
        let err = session.execute(&Statement::new("SELECT 1")).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedStatement(_)));
    }

    #[test]
    fn test_session_open_requires_database() {
        let mut store = MemoryRelationalStore::new();
        let err = store.session(Some("nope")).unwrap_err();
        assert!(matches!(err, StoreError::DatabaseMissing(_)));
    }
}
