//! Snapshot row → search document field maps.
//!
//! One map per entity kind, dispatched on [`EntityKind`] so every kind is
//! handled or the build fails. The document field names are the wire
//! short-codes existing indices carry; they must not drift.
//!
//! Column-value handling mirrors the stores' conventions: a NULL string
//! column becomes a JSON null field, a NULL numeric column becomes 0, and a
//! JSON column that fails to parse is logged with the offending raw value
//! and dropped from that document only.

use serde_json::Value;
use tracing::warn;

use super::errors::{TransformError, TransformResult};
use super::partition::RoutingKey;
use crate::model::EntityKind;
use crate::store::{BulkDoc, JsonMap, SqlRow};

/// Entity type whose `links` column predates the JSON encoding.
const LEGACY_LINKS_TYPE: &str = "UserData";

/// Entity type scoped to the whole domain rather than one cell.
const DOMAIN_TYPE: &str = "domain";

/// One transformed row: the document plus its routing key.
#[derive(Debug)]
pub struct MappedDoc {
    pub routing: RoutingKey,
    pub doc: BulkDoc,
}

/// Map one snapshot row to its document.
pub fn map_row(kind: EntityKind, row: &SqlRow) -> TransformResult<MappedDoc> {
    match kind {
        EntityKind::Cell => map_cell(row),
        EntityKind::Link => map_link(row),
        EntityKind::DavNode => map_dav_node(row),
        EntityKind::Entity => map_entity(row),
    }
}

fn required<'a>(
    row: &'a SqlRow,
    kind: EntityKind,
    column: &'static str,
) -> TransformResult<&'a str> {
    row.text(column).ok_or(TransformError::MissingColumn {
        table: kind.snapshot_table(),
        column,
    })
}

fn text(row: &SqlRow, column: &str) -> Value {
    row.text(column).map_or(Value::Null, |s| Value::String(s.to_string()))
}

fn int(row: &SqlRow, column: &str) -> Value {
    Value::from(row.int(column).unwrap_or(0))
}

/// Parse a JSON column; `Some(Null)` for a NULL column, `None` (drop the
/// field) for a malformed value.
fn json(row: &SqlRow, column: &str, id: &str) -> Option<Value> {
    let Some(raw) = row.text(column) else {
        return Some(Value::Null);
    };
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(id, column, raw, %err, "malformed stored JSON; dropping field");
            None
        }
    }
}

fn put_json(body: &mut JsonMap, key: &str, row: &SqlRow, column: &str, id: &str) {
    if let Some(value) = json(row, column, id) {
        body.insert(key.to_string(), value);
    }
}

/// Parse the legacy bracketed, quoted, comma-separated `links` list.
///
/// Tied to (Entity, type == "UserData") only; it must not become a fallback
/// that could mask real JSON errors elsewhere.
fn legacy_links(raw: &str) -> Vec<String> {
    raw.replace(['[', ']'], "")
        .split(',')
        .map(|part| part.trim().replace('"', ""))
        .filter(|part| !part.is_empty())
        .collect()
}

fn map_cell(row: &SqlRow) -> TransformResult<MappedDoc> {
    let id = required(row, EntityKind::Cell, "id")?.to_string();
    let mut body = JsonMap::new();
    body.insert("u".to_string(), int(row, "updated"));
    body.insert("b".to_string(), text(row, "box_id"));
    body.insert("c".to_string(), text(row, "cell_id"));
    body.insert("p".to_string(), int(row, "published"));
    body.insert("n".to_string(), text(row, "node_id"));
    put_json(&mut body, "l", row, "links", &id);
    put_json(&mut body, "a", row, "acl", &id);
    put_json(&mut body, "d", row, "dynamic_properties", &id);
    put_json(&mut body, "s", row, "declared_properties", &id);
    put_json(&mut body, "h", row, "hidden_properties", &id);
    Ok(MappedDoc {
        routing: RoutingKey::Reserved,
        doc: BulkDoc { id, doc_type: "Cell".to_string(), body },
    })
}

fn map_link(row: &SqlRow) -> TransformResult<MappedDoc> {
    let id = required(row, EntityKind::Link, "id")?.to_string();
    let cell_id = required(row, EntityKind::Link, "cell_id")?.to_string();
    let mut body = JsonMap::new();
    body.insert("t2".to_string(), text(row, "ent2_type"));
    body.insert("u".to_string(), int(row, "updated"));
    body.insert("b".to_string(), text(row, "box_id"));
    body.insert("t1".to_string(), text(row, "ent1_type"));
    body.insert("c".to_string(), text(row, "cell_id"));
    body.insert("p".to_string(), int(row, "published"));
    body.insert("k1".to_string(), text(row, "ent1_id"));
    body.insert("k2".to_string(), text(row, "ent2_id"));
    body.insert("n".to_string(), text(row, "node_id"));
    Ok(MappedDoc {
        routing: RoutingKey::Cell(cell_id),
        doc: BulkDoc { id, doc_type: "link".to_string(), body },
    })
}

fn map_dav_node(row: &SqlRow) -> TransformResult<MappedDoc> {
    let id = required(row, EntityKind::DavNode, "id")?.to_string();
    let cell_id = required(row, EntityKind::DavNode, "cell_id")?.to_string();
    let mut body = JsonMap::new();
    body.insert("c".to_string(), text(row, "cell_id"));
    body.insert("b".to_string(), text(row, "box_id"));
    body.insert("t".to_string(), text(row, "node_type"));
    body.insert("s".to_string(), text(row, "parent_id"));
    body.insert("p".to_string(), int(row, "published"));
    body.insert("u".to_string(), int(row, "updated"));
    put_json(&mut body, "o", row, "children", &id);
    put_json(&mut body, "a", row, "acl", &id);
    put_json(&mut body, "d", row, "properties", &id);
    put_json(&mut body, "f", row, "file", &id);
    Ok(MappedDoc {
        routing: RoutingKey::Cell(cell_id),
        doc: BulkDoc { id, doc_type: "dav".to_string(), body },
    })
}

fn map_entity(row: &SqlRow) -> TransformResult<MappedDoc> {
    let id = required(row, EntityKind::Entity, "id")?.to_string();
    let doc_type = required(row, EntityKind::Entity, "type")?.to_string();

    let routing = if doc_type.eq_ignore_ascii_case(DOMAIN_TYPE) {
        RoutingKey::Reserved
    } else {
        RoutingKey::Cell(required(row, EntityKind::Entity, "cell_id")?.to_string())
    };

    let mut body = JsonMap::new();
    body.insert("c".to_string(), text(row, "cell_id"));
    body.insert("b".to_string(), text(row, "box_id"));
    body.insert("n".to_string(), text(row, "node_id"));
    body.insert("t".to_string(), text(row, "entity_id"));
    body.insert("p".to_string(), int(row, "published"));
    body.insert("u".to_string(), int(row, "updated"));
    put_json(&mut body, "s", row, "declared_properties", &id);
    put_json(&mut body, "d", row, "dynamic_properties", &id);
    put_json(&mut body, "h", row, "hidden_properties", &id);

    if doc_type == LEGACY_LINKS_TYPE {
        let links = row.text("links").map_or_else(Vec::new, legacy_links);
        body.insert(
            "l".to_string(),
            Value::Array(links.into_iter().map(Value::String).collect()),
        );
    } else {
        put_json(&mut body, "l", row, "links", &id);
    }

    Ok(MappedDoc { routing, doc: BulkDoc { id, doc_type, body } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqlValue;
    use serde_json::json;

    fn base_row(pairs: &[(&str, SqlValue)]) -> SqlRow {
        let mut row = SqlRow::new();
        for (column, value) in pairs {
            row.set((*column).to_string(), value.clone());
        }
        row
    }

    #[test]
    fn test_cell_field_map() {
        let row = base_row(&[
            ("id", SqlValue::Text("c1".into())),
            ("type", SqlValue::Text("Cell".into())),
            ("cell_id", SqlValue::Null),
            ("box_id", SqlValue::Text("b1".into())),
            ("node_id", SqlValue::Text("n1".into())),
            ("links", SqlValue::Text(r#"{"r":["x"]}"#.into())),
            ("acl", SqlValue::Null),
            ("published", SqlValue::Int(50)),
            ("updated", SqlValue::Int(100)),
        ]);
        let mapped = map_row(EntityKind::Cell, &row).unwrap();
        assert_eq!(mapped.routing, RoutingKey::Reserved);
        assert_eq!(mapped.doc.doc_type, "Cell");
        assert_eq!(mapped.doc.body["u"], json!(100));
        assert_eq!(mapped.doc.body["p"], json!(50));
        assert_eq!(mapped.doc.body["b"], json!("b1"));
        assert_eq!(mapped.doc.body["l"], json!({"r": ["x"]}));
        assert_eq!(mapped.doc.body["a"], Value::Null);
        // Missing numeric columns read as 0, like the store drivers report
        // NULL BIGINT columns.
        let bare = base_row(&[("id", SqlValue::Text("c2".into()))]);
        let mapped = map_row(EntityKind::Cell, &bare).unwrap();
        assert_eq!(mapped.doc.body["u"], json!(0));
    }

    #[test]
    fn test_link_routes_by_cell() {
        let row = base_row(&[
            ("id", SqlValue::Text("l1".into())),
            ("cell_id", SqlValue::Text("C1".into())),
            ("ent1_type", SqlValue::Text("Role".into())),
            ("ent1_id", SqlValue::Text("r1".into())),
            ("ent2_type", SqlValue::Text("Box".into())),
            ("ent2_id", SqlValue::Text("b1".into())),
            ("updated", SqlValue::Int(7)),
        ]);
        let mapped = map_row(EntityKind::Link, &row).unwrap();
        assert_eq!(mapped.routing, RoutingKey::Cell("C1".to_string()));
        assert_eq!(mapped.doc.doc_type, "link");
        assert_eq!(mapped.doc.body["t1"], json!("Role"));
        assert_eq!(mapped.doc.body["k2"], json!("b1"));
    }

    #[test]
    fn test_dav_node_json_columns() {
        let row = base_row(&[
            ("id", SqlValue::Text("d1".into())),
            ("cell_id", SqlValue::Text("C1".into())),
            ("node_type", SqlValue::Text("dav.file".into())),
            ("file", SqlValue::Text(r#"{"length":10}"#.into())),
            ("children", SqlValue::Null),
        ]);
        let mapped = map_row(EntityKind::DavNode, &row).unwrap();
        assert_eq!(mapped.doc.doc_type, "dav");
        assert_eq!(mapped.doc.body["t"], json!("dav.file"));
        assert_eq!(mapped.doc.body["f"], json!({"length": 10}));
        assert_eq!(mapped.doc.body["o"], Value::Null);
    }

    #[test]
    fn test_user_data_links_use_legacy_list_parser() {
        let row = base_row(&[
            ("id", SqlValue::Text("u1".into())),
            ("type", SqlValue::Text("UserData".into())),
            ("cell_id", SqlValue::Text("C1".into())),
            ("links", SqlValue::Text(r#"["a", "b" , ""]"#.into())),
        ]);
        let mapped = map_row(EntityKind::Entity, &row).unwrap();
        assert_eq!(mapped.doc.body["l"], json!(["a", "b"]));
    }

    #[test]
    fn test_non_user_data_links_stay_json() {
        let row = base_row(&[
            ("id", SqlValue::Text("e1".into())),
            ("type", SqlValue::Text("Role".into())),
            ("cell_id", SqlValue::Text("C1".into())),
            ("links", SqlValue::Text(r#"{"Box":"b1"}"#.into())),
        ]);
        let mapped = map_row(EntityKind::Entity, &row).unwrap();
        assert_eq!(mapped.doc.body["l"], json!({"Box": "b1"}));
    }

    #[test]
    fn test_domain_entity_routes_to_reserved_key() {
        let row = base_row(&[
            ("id", SqlValue::Text("dom1".into())),
            ("type", SqlValue::Text("domain".into())),
        ]);
        let mapped = map_row(EntityKind::Entity, &row).unwrap();
        assert_eq!(mapped.routing, RoutingKey::Reserved);
    }

    #[test]
    fn test_malformed_json_drops_only_that_field() {
        let row = base_row(&[
            ("id", SqlValue::Text("c1".into())),
            ("acl", SqlValue::Text("{not json".into())),
            ("links", SqlValue::Text(r#"{"ok":true}"#.into())),
        ]);
        let mapped = map_row(EntityKind::Cell, &row).unwrap();
        assert!(!mapped.doc.body.contains_key("a"));
        assert_eq!(mapped.doc.body["l"], json!({"ok": true}));
    }

    #[test]
    fn test_missing_id_is_a_row_error() {
        let row = base_row(&[("type", SqlValue::Text("Cell".into()))]);
        let err = map_row(EntityKind::Cell, &row).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn { column: "id", .. }));
    }
}
