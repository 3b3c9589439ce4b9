//! Shared data model for the reconciliation and recovery tools.
//!
//! Both tools operate on the same four entity kinds, each backed by one
//! relational table and one search-store document type. The mapping between
//! kind, table name, and document type is fixed here; everything else
//! dispatches on [`EntityKind`] so a missing arm is a compile error.

use serde::Serialize;

/// Category suffix of the administrative container (`<prefix>_ad`).
pub const ADMIN_CATEGORY: &str = "ad";

/// Tenant key owning Cell documents that carry no owner field.
pub const ANONYMOUS_TENANT: &str = "anon";

/// Reserved routing key for Cell documents and cell-less domain entities.
pub const CELL_ROUTING_KEY: &str = "cellRoot";

/// File-name suffix marking a logically deleted binary file.
pub const TOMBSTONE_SUFFIX: &str = ".deleted";

/// Sub-kind value identifying file nodes among DavNode documents.
pub const DAV_FILE_SUBKIND: &str = "dav.file";

/// Sentinel staged in place of a revision the search store did not return.
pub const MISSING_REVISION: i64 = i64::MIN;

/// The four entity kinds shared by both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EntityKind {
    Cell,
    Link,
    DavNode,
    Entity,
}

impl EntityKind {
    /// Kind order of a reconciliation pass.
    pub const CHECK_ORDER: [EntityKind; 4] = [
        EntityKind::Cell,
        EntityKind::Link,
        EntityKind::DavNode,
        EntityKind::Entity,
    ];

    /// Kind order of a recovery pass.
    pub const RECOVERY_ORDER: [EntityKind; 4] = [
        EntityKind::Entity,
        EntityKind::Cell,
        EntityKind::DavNode,
        EntityKind::Link,
    ];

    /// Relational source table for this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Cell => "CELL",
            EntityKind::Link => "LINK",
            EntityKind::DavNode => "DAV_NODE",
            EntityKind::Entity => "ENTITY",
        }
    }

    /// Sequenced snapshot table for this kind.
    pub fn snapshot_table(self) -> &'static str {
        match self {
            EntityKind::Cell => "CELL_COPIED",
            EntityKind::Link => "LINK_COPIED",
            EntityKind::DavNode => "DAV_NODE_COPIED",
            EntityKind::Entity => "ENTITY_COPIED",
        }
    }

    /// Search-store document type, where the kind fixes it.
    ///
    /// Entity documents carry their row's own type value, so `Entity` has no
    /// fixed document type.
    pub fn fixed_doc_type(self) -> Option<&'static str> {
        match self {
            EntityKind::Cell => Some("Cell"),
            EntityKind::Link => Some("link"),
            EntityKind::DavNode => Some("dav"),
            EntityKind::Entity => None,
        }
    }

    /// Display name used in progress logging.
    pub fn display_name(self) -> &'static str {
        match self {
            EntityKind::Cell => "Cell",
            EntityKind::Link => "Link",
            EntityKind::DavNode => "DavNode",
            EntityKind::Entity => "Entity",
        }
    }
}

/// One scanned (id, revision) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationRecord {
    pub id: String,
    pub revision: i64,
}

impl ReconciliationRecord {
    pub fn new(id: impl Into<String>, revision: i64) -> Self {
        Self { id: id.into(), revision }
    }
}

/// Classification of a detected inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MismatchKind {
    /// Present in the system of record, absent from the search store.
    MissingInTarget,
    /// Present in the search store, absent from the system of record.
    MissingInSource,
    /// Present in both with differing revisions.
    RevisionMismatch,
}

impl MismatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MismatchKind::MissingInTarget => "missing-in-target",
            MismatchKind::MissingInSource => "missing-in-source",
            MismatchKind::RevisionMismatch => "revision-mismatch",
        }
    }
}

/// One reported inconsistency. Transient: reported, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRecord {
    pub id: String,
    pub revision: i64,
    pub entity_kind: EntityKind,
    pub tenant: String,
    pub kind: MismatchKind,
}

/// A matched (search container, relational database) pair for one tenant.
///
/// The administrative container pairs with no database; it holds the
/// cross-tenant Cell documents and is always considered matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContainerPair {
    pub tenant_key: String,
    pub search_container: String,
    pub database: Option<String>,
}

impl TenantContainerPair {
    pub fn is_admin(&self) -> bool {
        self.database.is_none()
    }
}

/// Name of the administrative container under a prefix.
pub fn admin_container(prefix: &str) -> String {
    format!("{}_{}", prefix, ADMIN_CATEGORY)
}

/// Container (or database) name for a tenant under a prefix.
pub fn container_name(prefix: &str, tenant: &str) -> String {
    format!("{}_{}", prefix, tenant)
}

/// Tenant key of a prefixed container (or database) name.
pub fn tenant_key(prefix: &str, name: &str) -> Option<String> {
    name.strip_prefix(&format!("{}_", prefix)).map(str::to_string)
}
