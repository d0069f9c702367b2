//! SQL statement validator.
//!
//! Read-only enforcement is a prefix check on the statement text; the row cap
//! is a textual append. Neither parses SQL.

use crate::errors::{AppError, AppResult};

/// Validates and rewrites incoming SQL text.
pub struct SqlValidator;

impl SqlValidator {
    /// Checks if the SQL is a SELECT query.
    pub fn is_select(sql: &str) -> bool {
        sql.trim().to_uppercase().starts_with("SELECT")
    }

    /// Trims the statement and rejects anything that does not start with `SELECT`.
    ///
    /// # Errors
    /// Returns `AppError::InvalidQuery` for non-SELECT statements.
    pub fn ensure_select(sql: &str) -> AppResult<&str> {
        let trimmed = sql.trim();
        if !Self::is_select(trimmed) {
            return Err(AppError::InvalidQuery(
                "Only SELECT queries are allowed".to_string(),
            ));
        }
        Ok(trimmed)
    }

    /// Whether the text mentions `LIMIT` anywhere, case-insensitively.
    pub fn has_limit(sql: &str) -> bool {
        sql.to_uppercase().contains("LIMIT")
    }

    /// Appends ` LIMIT {limit}` unless the text already mentions `LIMIT`.
    ///
    /// This is an unsafe textual rewrite: a `LIMIT` inside a subquery, a
    /// string literal or an identifier suppresses the cap, and trailing
    /// comments are not understood. Only trailing `;` characters are removed.
    /// A `limit` of zero or less leaves the statement untouched.
    pub fn append_limit_textual(sql: &str, limit: i64) -> String {
        if limit > 0 && !Self::has_limit(sql) {
            format!("{} LIMIT {}", sql.trim_end_matches(';'), limit)
        } else {
            sql.to_string()
        }
    }

    /// Quotes an identifier for interpolation (`"` doubled).
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
