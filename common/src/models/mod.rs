//! Request and response payloads.

pub mod query;
pub mod schema;

pub use query::{QueryBody, QueryParams, QueryRequest, QueryResult, SchemaParams, TablesParams};
pub use schema::{
    ColumnDescriptor, DatabaseInfo, DatabaseReport, DatabaseStatus, TableInfo, TableSchema,
    TablesResponse,
};
