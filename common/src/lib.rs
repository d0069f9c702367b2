//! Shared building blocks for the SQLite bridge.
//!
//! - [`config`]: runtime configuration
//! - [`errors`]: the error type every handler returns
//! - [`logging`]: tracing subscriber setup
//! - [`middleware`]: request id propagation
//! - [`models`]: request and response payloads
//! - [`response`]: error body and panic responses
//! - [`utils`]: SQL text helpers

pub mod config;
pub mod errors;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
