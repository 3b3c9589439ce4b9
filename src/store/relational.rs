//! Relational store capability.
//!
//! The engine never owns a SQL client. It builds parameterized [`Statement`]s
//! and executes them through [`SqlSession`], which a deployment backs with a
//! real connection. Statement text is produced exclusively by the builders in
//! the `staging` and `checkpoint` modules so that every implementation sees
//! the same fixed shapes.
//!
//! Connection discipline:
//! - reconciliation opens one session for the whole run
//! - recovery opens one session per tenant database, closed after that
//!   tenant's pass (dropping the session closes it)

use std::collections::BTreeMap;
use std::fmt;

use super::errors::StoreResult;
use crate::model::ReconciliationRecord;

/// A SQL value: parameter or result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Null,
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlRow(BTreeMap<String, SqlValue>);

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: SqlValue) -> &mut Self {
        self.0.insert(column.into(), value);
        self
    }

    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.0.insert(column.into(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    /// Text value of a column; NULL and absent both read as `None`.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(SqlValue::as_text)
    }

    /// Integer value of a column; NULL and absent both read as `None`.
    pub fn int(&self, column: &str) -> Option<i64> {
        self.0.get(column).and_then(SqlValue::as_int)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &SqlValue)> {
        self.0.iter()
    }
}

/// A parameterized SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self { sql: sql.into(), params }
    }
}

/// A schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self { database: database.into(), table: table.into() }
    }

    /// Backtick-quoted `` `db`.`table` `` form used in statement text.
    pub fn qualified(&self) -> String {
        format!("`{}`.`{}`", self.database, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// One open connection's worth of DDL/DML capability.
pub trait SqlSession: fmt::Debug {
    /// Execute a statement with no result set; returns affected rows.
    fn execute(&mut self, statement: &Statement) -> StoreResult<u64>;

    /// Execute a single-value `COUNT(*)` query.
    fn query_count(&mut self, statement: &Statement) -> StoreResult<u64>;

    /// Execute an (id, updated) projection query.
    fn query_records(&mut self, statement: &Statement) -> StoreResult<Vec<ReconciliationRecord>>;

    /// Execute a full-row query.
    fn query_rows(&mut self, statement: &Statement) -> StoreResult<Vec<SqlRow>>;
}

/// The relational store capability.
pub trait RelationalStore {
    /// Enumerate database names.
    fn list_databases(&mut self) -> StoreResult<Vec<String>>;

    /// Open a session, optionally bound to one database.
    fn session(&mut self, database: Option<&str>) -> StoreResult<Box<dyn SqlSession>>;
}
