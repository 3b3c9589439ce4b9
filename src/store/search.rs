//! Search store capability.
//!
//! Paginated scans, bulk writes with deferred acknowledgments, and the
//! container-level operations recovery needs (create/delete, replica count,
//! refresh). Document bodies are JSON maps carrying the wire field
//! short-codes; this layer knows documents and types, not entity kinds.

use serde_json::{Map, Value};

use super::errors::StoreResult;

/// JSON object body of a document or hit source.
pub type JsonMap = Map<String, Value>;

/// One hit returned by a paginated scan.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    /// The `u` (updated) field, when the store returned one.
    pub revision: Option<i64>,
    pub source: JsonMap,
}

impl SearchHit {
    /// String field of the source, one level deep.
    pub fn source_str(&self, key: &str) -> Option<&str> {
        self.source.get(key).and_then(Value::as_str)
    }

    /// String field of a nested source object, two levels deep.
    pub fn nested_str(&self, key: &str, inner: &str) -> Option<&str> {
        self.source
            .get(key)
            .and_then(Value::as_object)
            .and_then(|m| m.get(inner))
            .and_then(Value::as_str)
    }
}

/// Ownership restriction for administrative-container Cell scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerFilter {
    /// Documents carrying no owner field (the anonymous tenant's).
    Missing,
    /// Documents whose encoded owner resolves to this tenant.
    Tenant(String),
}

/// Server-side restriction of a paginated scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFilter {
    /// Documents of exactly this type.
    DocType(String),
    /// Documents of none of these types.
    ExcludeDocTypes(Vec<String>),
    /// Cell documents restricted by ownership.
    CellOwner(OwnerFilter),
}

/// Continuation handle of one open scan. Scoped to a single pass.
#[derive(Debug, PartialEq, Eq)]
pub struct ScanHandle(pub u64);

/// Handle to one outstanding bulk acknowledgment.
#[derive(Debug, PartialEq, Eq)]
pub struct BulkTicket(pub u64);

/// One failed document within a bulk acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

/// Acknowledgment of one bulk write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkAck {
    pub failures: Vec<BulkFailure>,
}

impl BulkAck {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One-line cause detail for failure logging.
    pub fn failure_message(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}: {}]", f.id, f.reason))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One document of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDoc {
    pub id: String,
    pub doc_type: String,
    pub body: JsonMap,
}

/// The search store capability.
pub trait SearchStore {
    /// Enumerate container names.
    fn list_containers(&mut self) -> StoreResult<Vec<String>>;

    /// Create a container. Errors with `ContainerExists` when present.
    fn create_container(&mut self, name: &str) -> StoreResult<()>;

    /// Delete a container. Errors with `ContainerMissing` when absent.
    fn delete_container(&mut self, name: &str) -> StoreResult<()>;

    /// Set the replica count of a container. Shared cluster state.
    fn set_replica_count(&mut self, container: &str, replicas: u32) -> StoreResult<()>;

    /// Make all completed writes visible to scans.
    fn refresh_container(&mut self, container: &str) -> StoreResult<()>;

    /// Open a filtered scan; returns the handle and the total matching count.
    fn open_scan(
        &mut self,
        container: &str,
        filter: &ScanFilter,
        page_size: usize,
    ) -> StoreResult<(ScanHandle, u64)>;

    /// Next page of an open scan; an empty page means the scan is drained.
    fn next_page(&mut self, handle: &ScanHandle) -> StoreResult<Vec<SearchHit>>;

    /// Release an open scan's server-side state.
    fn close_scan(&mut self, handle: ScanHandle);

    /// Submit one bulk write of routing-keyed partitions; acknowledgment is
    /// collected later via [`SearchStore::take_ack`].
    fn bulk_write(
        &mut self,
        container: &str,
        partitions: Vec<(String, Vec<BulkDoc>)>,
    ) -> StoreResult<BulkTicket>;

    /// Submit one bulk write under a single routing key and wait for its
    /// acknowledgment.
    fn bulk_write_sync(
        &mut self,
        container: &str,
        routing: &str,
        docs: Vec<BulkDoc>,
    ) -> StoreResult<BulkAck>;

    /// Collect the acknowledgment of an earlier bulk write.
    fn take_ack(&mut self, ticket: BulkTicket) -> StoreResult<BulkAck>;

    /// Delete one document by id under a routing key.
    fn delete_document(
        &mut self,
        container: &str,
        doc_type: &str,
        routing: &str,
        id: &str,
    ) -> StoreResult<()>;
}
