//! Introspection models.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One column of a table, as reported by SQLite's `table_info` pragma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnDescriptor {
    /// Column position.
    pub cid: i64,
    /// Column name.
    pub name: String,
    /// Declared type (may be empty).
    #[serde(rename = "type")]
    pub data_type: String,
    /// `1` when the column is declared `NOT NULL`, else `0`.
    pub notnull: i64,
    /// Default value expression, as written in the schema.
    pub dflt_value: Option<String>,
    /// 1-based position in the primary key, `0` when not part of it.
    pub pk: i64,
}

/// Schema and size of one table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableInfo {
    pub schema: Vec<ColumnDescriptor>,
    pub row_count: i64,
}

/// Response of `GET /tables`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TablesResponse {
    pub database: String,
    pub tables: Vec<String>,
}

/// Response of `GET /schema`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableSchema {
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub row_count: i64,
}

/// Reachability of a configured database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    Connected,
    NotFound,
    Error,
}

/// Report for one configured database.
///
/// Only `status` and `error` are present when the database could not be read.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseReport {
    pub status: DatabaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_info: Option<BTreeMap<String, TableInfo>>,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Modification time in seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseReport {
    /// Report for a readable database.
    pub fn connected(
        tables: Vec<String>,
        table_info: BTreeMap<String, TableInfo>,
        file_size: u64,
        last_modified: f64,
    ) -> Self {
        Self {
            status: DatabaseStatus::Connected,
            tables: Some(tables),
            table_info: Some(table_info),
            file_size: Some(file_size),
            last_modified: Some(last_modified),
            error: None,
        }
    }

    /// Report for a path with no file behind it.
    pub fn not_found() -> Self {
        Self::failed(DatabaseStatus::NotFound, "Database file not found")
    }

    /// Report for a database that exists but could not be read.
    pub fn error(message: impl Into<String>) -> Self {
        Self::failed(DatabaseStatus::Error, message)
    }

    fn failed(status: DatabaseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            tables: None,
            table_info: None,
            file_size: None,
            last_modified: None,
            error: Some(message.into()),
        }
    }
}

/// Response of `GET /info`: path to report, in configuration order.
pub type DatabaseInfo = IndexMap<String, DatabaseReport>;
