//! Query models.
//!
//! Raw parameter structs keep every field optional so that a missing value
//! becomes a JSON `400` through [`AppError`] instead of an extractor
//! rejection. They are normalized into a [`QueryRequest`] before execution.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// A validated query request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Database file path.
    pub db: String,
    /// Raw SQL text as received.
    pub query: String,
    /// Row cap; `0` or negative means unlimited.
    pub limit: i64,
}

/// Query string of `GET /query`.
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryParams {
    /// Database file path.
    #[validate(
        required(message = "Missing 'db' or 'q' parameters"),
        length(min = 1, message = "Missing 'db' or 'q' parameters")
    )]
    pub db: Option<String>,
    /// SQL text.
    #[validate(
        required(message = "Missing 'db' or 'q' parameters"),
        length(min = 1, message = "Missing 'db' or 'q' parameters")
    )]
    pub q: Option<String>,
    /// Row cap (defaults to 100).
    pub limit: Option<String>,
}

impl QueryParams {
    /// Validates the parameters and applies the default row cap.
    pub fn into_request(self, default_limit: i64) -> AppResult<QueryRequest> {
        self.validate()?;
        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => default_limit,
            Some(raw) => raw.parse().map_err(|_| {
                AppError::BadRequest(format!("Invalid 'limit' parameter: {}", raw))
            })?,
        };
        Ok(QueryRequest {
            db: self.db.unwrap_or_default(),
            query: self.q.unwrap_or_default(),
            limit,
        })
    }
}

/// JSON body of `POST /query`.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct QueryBody {
    /// Database file path.
    #[validate(
        required(message = "Missing 'db' or 'query' in JSON body"),
        length(min = 1, message = "Missing 'db' or 'query' in JSON body")
    )]
    pub db: Option<String>,
    /// SQL text.
    #[validate(
        required(message = "Missing 'db' or 'query' in JSON body"),
        length(min = 1, message = "Missing 'db' or 'query' in JSON body")
    )]
    pub query: Option<String>,
    /// Row cap (defaults to 100).
    pub limit: Option<i64>,
}

impl QueryBody {
    /// Parses a request body.
    pub fn from_slice(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|_| AppError::BadRequest("Invalid JSON in request body".to_string()))
    }

    /// Validates the body and applies the default row cap.
    pub fn into_request(self, default_limit: i64) -> AppResult<QueryRequest> {
        self.validate()?;
        Ok(QueryRequest {
            db: self.db.unwrap_or_default(),
            query: self.query.unwrap_or_default(),
            limit: self.limit.unwrap_or(default_limit),
        })
    }
}

/// Query string of `GET /tables`.
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TablesParams {
    /// Database file path.
    #[validate(
        required(message = "Missing 'db' parameter"),
        length(min = 1, message = "Missing 'db' parameter")
    )]
    pub db: Option<String>,
}

impl TablesParams {
    /// Returns the validated database path.
    pub fn into_db(self) -> AppResult<String> {
        self.validate()?;
        Ok(self.db.unwrap_or_default())
    }
}

/// Query string of `GET /schema`.
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchemaParams {
    /// Database file path.
    #[validate(
        required(message = "Missing 'db' or 'table' parameters"),
        length(min = 1, message = "Missing 'db' or 'table' parameters")
    )]
    pub db: Option<String>,
    /// Table name.
    #[validate(
        required(message = "Missing 'db' or 'table' parameters"),
        length(min = 1, message = "Missing 'db' or 'table' parameters")
    )]
    pub table: Option<String>,
}

impl SchemaParams {
    /// Returns the validated `(db, table)` pair.
    pub fn into_parts(self) -> AppResult<(String, String)> {
        self.validate()?;
        Ok((self.db.unwrap_or_default(), self.table.unwrap_or_default()))
    }
}

/// Result of a query execution.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// Statement that was actually executed (after row cap rewriting).
    pub query: String,
    /// Column names in statement order.
    pub columns: Vec<String>,
    /// Rows as column name to value mappings, in engine order.
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Map<String, Value>>,
    /// Number of rows returned.
    pub count: usize,
    /// Execution timestamp (RFC 3339).
    pub executed_at: String,
}

impl QueryResult {
    /// Builds a result stamped with the current time.
    pub fn new(query: String, columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        Self {
            query,
            columns,
            count: rows.len(),
            rows,
            executed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}
