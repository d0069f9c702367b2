//! HTTP handlers.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::{AppError, AppResult};
use common::models::query::{QueryBody, QueryParams, QueryResult, SchemaParams, TablesParams};
use common::models::schema::{DatabaseInfo, TableSchema, TablesResponse};

use crate::service::{BridgeService, BridgeServiceTrait};
use crate::state::AppState;

const SERVICE_TITLE: &str = "SQLite Bridge";

/// Capability document
#[utoipa::path(
    get,
    path = "/",
    tag = "bridge",
    responses(
        (status = 200, description = "Service description and endpoint list", body = ServiceInfo)
    )
)]
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let endpoints = [
        ("GET /", "This help message"),
        ("GET /health", "Liveness check"),
        ("GET /info", "Database information"),
        ("GET /tables?db=<db_path>", "List tables in database"),
        ("GET /schema?db=<db_path>&table=<table>", "Describe a table"),
        ("GET /query?db=<db_path>&q=<query>&limit=<limit>", "Execute query"),
        ("POST /query", "Execute query (JSON body: {db, query, limit})"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(ServiceInfo {
        service: SERVICE_TITLE.to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        databases: state.registry.configured_paths().to_vec(),
        endpoints,
    })
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        open_handles: state.registry.open_count().await,
    })
}

/// Report on every configured database
#[utoipa::path(
    get,
    path = "/info",
    tag = "bridge",
    responses(
        (status = 200, description = "Per-database status, tables, schemas and file metadata, keyed by path")
    )
)]
pub async fn database_info(State(state): State<AppState>) -> Json<DatabaseInfo> {
    let service = BridgeService::new(state.registry);
    Json(service.get_database_info().await)
}

/// List the tables of a database
#[utoipa::path(
    get,
    path = "/tables",
    tag = "bridge",
    params(TablesParams),
    responses(
        (status = 200, description = "Table names", body = TablesResponse),
        (status = 400, description = "Missing or unknown database", body = common::response::ErrorBody)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    params: Result<Query<TablesParams>, QueryRejection>,
) -> AppResult<Json<TablesResponse>> {
    let Query(params) = params.map_err(bad_query_string)?;
    let db = params.into_db()?;

    let service = BridgeService::new(state.registry);
    let tables = service.list_tables(&db).await?;
    Ok(Json(TablesResponse {
        database: db,
        tables,
    }))
}

/// Describe one table
#[utoipa::path(
    get,
    path = "/schema",
    tag = "bridge",
    params(SchemaParams),
    responses(
        (status = 200, description = "Column descriptors and row count", body = TableSchema),
        (status = 400, description = "Missing parameters, unknown database or table", body = common::response::ErrorBody)
    )
)]
pub async fn table_schema(
    State(state): State<AppState>,
    params: Result<Query<SchemaParams>, QueryRejection>,
) -> AppResult<Json<TableSchema>> {
    let Query(params) = params.map_err(bad_query_string)?;
    let (db, table) = params.into_parts()?;

    let service = BridgeService::new(state.registry);
    let columns = service.describe_table(&db, &table).await?;
    let row_count = service.get_table_count(&db, &table).await?;
    Ok(Json(TableSchema {
        database: db,
        table,
        columns,
        row_count,
    }))
}

/// Execute a SELECT from the query string
#[utoipa::path(
    get,
    path = "/query",
    tag = "query",
    params(QueryParams),
    responses(
        (status = 200, description = "Query executed", body = QueryResult),
        (status = 400, description = "Missing parameters, non-SELECT statement or execution failure", body = common::response::ErrorBody)
    )
)]
pub async fn query_get(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> AppResult<Json<QueryResult>> {
    let Query(params) = params.map_err(bad_query_string)?;
    let req = params.into_request(state.config.default_limit)?;

    let service = BridgeService::new(state.registry);
    let result = service.execute(&req.db, &req.query, req.limit).await?;
    Ok(Json(result))
}

/// Execute a SELECT from a JSON body
#[utoipa::path(
    post,
    path = "/query",
    tag = "query",
    request_body = QueryBody,
    responses(
        (status = 200, description = "Query executed", body = QueryResult),
        (status = 400, description = "Invalid JSON, missing fields, non-SELECT statement or execution failure", body = common::response::ErrorBody)
    )
)]
pub async fn query_post(State(state): State<AppState>, body: Bytes) -> AppResult<Json<QueryResult>> {
    let req = QueryBody::from_slice(&body)?.into_request(state.config.default_limit)?;

    let service = BridgeService::new(state.registry);
    let result = service.execute(&req.db, &req.query, req.limit).await?;
    Ok(Json(result))
}

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found() -> AppError {
    AppError::EndpointNotFound
}

fn bad_query_string(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Capability document
#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
    pub version: String,
    /// Configured database paths.
    pub databases: Vec<String>,
    /// Endpoint signature to description.
    pub endpoints: BTreeMap<String, String>,
}

/// Liveness response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Number of database handles currently open.
    pub open_handles: usize,
}
