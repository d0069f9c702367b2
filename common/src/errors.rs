//! Bridge error type.
//!
//! Every fallible operation returns [`AppResult`]. The [`IntoResponse`]
//! impl renders errors as `{"error": <message>, "code": <status>}` with the
//! same HTTP status, so handlers can simply use `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::response::ErrorBody;

/// Errors surfaced by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A database file or table does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The statement is not a read-only SELECT.
    #[error("{0}")]
    InvalidQuery(String),

    /// The database file exists but could not be opened.
    #[error("{0}")]
    DatabaseConnection(String),

    /// SQLite rejected or failed the statement.
    #[error("{0}")]
    QueryExecution(String),

    /// Missing or malformed request parameters.
    #[error("{0}")]
    BadRequest(String),

    /// No route matches the request.
    #[error("Endpoint not found")]
    EndpointNotFound,

    /// Anything unexpected, including a panic inside a handler.
    #[error("{0}")]
    Internal(String),
}

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Database file missing on disk.
    pub fn database_not_found(path: &str) -> Self {
        AppError::NotFound(format!("Database file not found: {}", path))
    }

    /// Table not present in the database catalog.
    pub fn table_not_found(table: &str) -> Self {
        AppError::NotFound(format!("Table not found: {}", table))
    }

    /// HTTP status for this error.
    ///
    /// Lookup and validation failures on data routes are all client errors.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_)
            | AppError::InvalidQuery(_)
            | AppError::DatabaseConnection(_)
            | AppError::QueryExecution(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EndpointNotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => AppError::QueryExecution(db.message().to_string()),
            other => AppError::QueryExecution(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        // Several fields usually share one message ("Missing 'db' or 'q' ...").
        let mut messages = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid '{}'", field))
                })
            })
            .collect::<Vec<_>>();
        messages.sort();
        messages.dedup();
        AppError::BadRequest(messages.join("; "))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, code = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorBody::new(self.to_string(), status))).into_response()
    }
}
