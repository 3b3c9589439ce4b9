//! Routing-keyed bulk partitions.
//!
//! Documents of one batch are grouped by routing key before the bulk write.
//! The key is typed: either the owning cell's id, or the reserved cell-root
//! key for documents that have no owning cell. A partition holds exactly one
//! key variant, so reserved and tenant-scoped documents can never share one.

use std::collections::BTreeMap;

use crate::model::CELL_ROUTING_KEY;
use crate::store::BulkDoc;

/// Partition key of one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoutingKey {
    /// The fixed cell-root key.
    Reserved,
    /// The owning cell's id.
    Cell(String),
}

impl RoutingKey {
    /// Wire form of the key.
    pub fn as_store_key(&self) -> &str {
        match self {
            RoutingKey::Reserved => CELL_ROUTING_KEY,
            RoutingKey::Cell(id) => id,
        }
    }
}

/// Documents of one batch, grouped by routing key in insertion order per key.
#[derive(Debug, Default)]
pub struct BulkPartitions {
    map: BTreeMap<RoutingKey, Vec<BulkDoc>>,
}

impl BulkPartitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, routing: RoutingKey, doc: BulkDoc) {
        self.map.entry(routing).or_default().push(doc);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn partition_count(&self) -> usize {
        self.map.len()
    }

    pub fn doc_count(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    /// Flatten into the store call's (routing, documents) form.
    pub fn into_store_form(self) -> Vec<(String, Vec<BulkDoc>)> {
        self.map
            .into_iter()
            .map(|(key, docs)| (key.as_store_key().to_string(), docs))
            .collect()
    }
}
