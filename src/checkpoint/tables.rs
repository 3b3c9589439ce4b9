//! Fixed DDL/DML per entity kind.
//!
//! One dedicated snapshot table per kind, each the source schema plus a
//! leading `seq` auto-increment column the source tables do not have; the
//! sequence is what makes range-bounded paging possible. Table and column
//! names are fixed for compatibility with existing deployments.

use crate::model::EntityKind;
use crate::store::{SqlValue, Statement, TableRef};

/// Snapshot table reference for a kind inside one database.
pub fn snapshot_table(database: &str, kind: EntityKind) -> TableRef {
    TableRef::new(database, kind.snapshot_table())
}

/// Source table reference for a kind inside one database.
pub fn source_table(database: &str, kind: EntityKind) -> TableRef {
    TableRef::new(database, kind.table_name())
}

/// Source column list copied into the snapshot, in column order.
pub fn copied_columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Cell => {
            "id,type,cell_id,box_id,node_id,declared_properties,dynamic_properties,\
             hidden_properties,links,acl,published,updated"
        }
        EntityKind::Entity => {
            "id,type,cell_id,box_id,node_id,entity_id,declared_properties,\
             dynamic_properties,hidden_properties,links,published,updated"
        }
        EntityKind::DavNode => {
            "id,cell_id,box_id,node_type,parent_id,children,acl,properties,file,\
             published,updated"
        }
        EntityKind::Link => {
            "id,cell_id,box_id,node_id,ent1_type,ent1_id,ent2_type,ent2_id,\
             updated,published"
        }
    }
}

fn column_ddl(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Cell => {
            "`id` VARCHAR(40) BINARY NOT NULL , \
             `type` VARCHAR(40) NOT NULL , \
             `cell_id` VARCHAR(40) NULL , \
             `box_id` VARCHAR(40) NULL , \
             `node_id` VARCHAR(40) NULL , \
             `declared_properties` TEXT NULL , \
             `dynamic_properties` TEXT NULL , \
             `hidden_properties` TEXT NULL , \
             `links` TEXT NULL , \
             `acl` LONGTEXT NULL , \
             `published` BIGINT UNSIGNED NULL , \
             `updated` BIGINT UNSIGNED NULL"
        }
        EntityKind::Entity => {
            "`id` VARCHAR(40) BINARY NOT NULL , \
             `type` VARCHAR(200) NOT NULL , \
             `cell_id` VARCHAR(40) NULL , \
             `box_id` VARCHAR(40) NULL , \
             `node_id` VARCHAR(40) NULL , \
             `entity_id` VARCHAR(40) NULL , \
             `declared_properties` LONGTEXT NULL , \
             `dynamic_properties` LONGTEXT NULL , \
             `hidden_properties` TEXT NULL , \
             `links` LONGTEXT NULL , \
             `published` BIGINT UNSIGNED NULL , \
             `updated` BIGINT UNSIGNED NULL"
        }
        EntityKind::DavNode => {
            "`id` VARCHAR(40) BINARY NOT NULL , \
             `cell_id` VARCHAR(40) NULL , \
             `box_id` VARCHAR(40) NULL , \
             `node_type` VARCHAR(40) NULL , \
             `parent_id` VARCHAR(40) NULL , \
             `children` LONGTEXT NULL , \
             `acl` LONGTEXT NULL , \
             `properties` LONGTEXT NULL , \
             `file` TEXT NULL , \
             `published` BIGINT UNSIGNED NULL , \
             `updated` BIGINT UNSIGNED NULL"
        }
        EntityKind::Link => {
            "`id` VARCHAR(81) BINARY NOT NULL , \
             `cell_id` VARCHAR(40) NULL , \
             `box_id` VARCHAR(40) NULL , \
             `node_id` VARCHAR(40) NULL , \
             `ent1_type` VARCHAR(200) NOT NULL , \
             `ent1_id` VARCHAR(40) NOT NULL , \
             `ent2_type` VARCHAR(200) NOT NULL , \
             `ent2_id` VARCHAR(40) NOT NULL , \
             `updated` BIGINT UNSIGNED NULL , \
             `published` BIGINT UNSIGNED NULL"
        }
    }
}

/// `CREATE TABLE IF NOT EXISTS` for a kind's snapshot table.
pub fn create(database: &str, kind: EntityKind) -> Statement {
    Statement::new(format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         `seq` bigint not null auto_increment , {} , PRIMARY KEY (`seq`, `id`)\
         ) ENGINE=MyISAM DEFAULT CHARSET=utf8mb4 MAX_ROWS=4294967295",
        snapshot_table(database, kind).qualified(),
        column_ddl(kind)
    ))
}

/// `TRUNCATE TABLE` for a kind's snapshot table.
pub fn truncate(database: &str, kind: EntityKind) -> Statement {
    Statement::new(format!(
        "TRUNCATE TABLE {}",
        snapshot_table(database, kind).qualified()
    ))
}

/// `INSERT … SELECT` copying the source table into the snapshot, with the
/// leading NULL filling the auto-increment sequence.
pub fn copy(database: &str, kind: EntityKind) -> Statement {
    Statement::new(format!(
        "INSERT INTO {} SELECT NULL,{} FROM {}",
        snapshot_table(database, kind).qualified(),
        copied_columns(kind),
        source_table(database, kind).qualified()
    ))
}

/// `DROP TABLE IF EXISTS` for a kind's snapshot table.
pub fn drop(database: &str, kind: EntityKind) -> Statement {
    Statement::new(format!(
        "DROP TABLE IF EXISTS {}",
        snapshot_table(database, kind).qualified()
    ))
}

/// `SELECT COUNT(*)` over an arbitrary table of the database.
pub fn count(table: &TableRef) -> Statement {
    Statement::new(format!("SELECT COUNT(*) AS CNT FROM {}", table.qualified()))
}

/// Range-bounded page select over the snapshot's sequence column.
pub fn select_range(database: &str, kind: EntityKind, start: i64, end: i64) -> Statement {
    Statement::with_params(
        format!(
            "SELECT * FROM {} WHERE seq BETWEEN ? AND ?",
            snapshot_table(database, kind).qualified()
        ),
        vec![SqlValue::Int(start), SqlValue::Int(end)],
    )
}
