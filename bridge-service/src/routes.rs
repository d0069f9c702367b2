//! Route table.

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// Bridge routes. A known path hit with an unsupported method answers 404
/// like any unknown path.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root).fallback(handlers::not_found))
        .route("/health", get(handlers::health_check).fallback(handlers::not_found))
        .route("/info", get(handlers::database_info).fallback(handlers::not_found))
        .route("/tables", get(handlers::list_tables).fallback(handlers::not_found))
        .route("/schema", get(handlers::table_schema).fallback(handlers::not_found))
        .route(
            "/query",
            get(handlers::query_get)
                .post(handlers::query_post)
                .fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
}
