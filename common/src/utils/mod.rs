//! SQL text helpers.

pub mod sql_validator;

pub use sql_validator::SqlValidator;
