//! Query execution and introspection.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{Column, Either, Executor, Row, SqlitePool, Statement};

use common::errors::{AppError, AppResult};
use common::models::query::QueryResult;
use common::models::schema::{ColumnDescriptor, DatabaseInfo, DatabaseReport, TableInfo};
use common::utils::SqlValidator;

use crate::registry::ConnectionRegistry;
use crate::values::row_to_map;

/// Operations the HTTP layer needs from the bridge.
#[async_trait]
pub trait BridgeServiceTrait: Send + Sync {
    /// Runs a read-only query with an optional row cap.
    async fn execute(&self, path: &str, raw_query: &str, limit: i64) -> AppResult<QueryResult>;

    /// Lists the tables of a database.
    async fn list_tables(&self, path: &str) -> AppResult<Vec<String>>;

    /// Describes the columns of a known table.
    async fn describe_table(&self, path: &str, table: &str) -> AppResult<Vec<ColumnDescriptor>>;

    /// Counts the rows of a known table.
    async fn get_table_count(&self, path: &str, table: &str) -> AppResult<i64>;

    /// Reports on every configured database, isolating failures per path.
    async fn get_database_info(&self) -> DatabaseInfo;
}

/// SQLite bridge service backed by the connection registry.
pub struct BridgeService {
    registry: Arc<ConnectionRegistry>,
}

impl BridgeService {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    async fn database_report(&self, path: &str) -> AppResult<DatabaseReport> {
        let pool = self.registry.connect(path).await?;
        let tables = list_tables_on(&pool).await?;

        let mut table_info = BTreeMap::new();
        for table in &tables {
            table_info.insert(
                table.clone(),
                TableInfo {
                    schema: describe_known_table(&pool, table).await?,
                    row_count: count_known_table(&pool, table).await?,
                },
            );
        }

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stat {}: {}", path, e)))?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Ok(DatabaseReport::connected(
            tables,
            table_info,
            metadata.len(),
            last_modified,
        ))
    }

    /// Rejects table names the catalog does not know about.
    async fn ensure_known_table(pool: &SqlitePool, table: &str) -> AppResult<()> {
        // SQLite resolves identifiers case-insensitively.
        if list_tables_on(pool)
            .await?
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
        {
            Ok(())
        } else {
            Err(AppError::table_not_found(table))
        }
    }
}

#[async_trait]
impl BridgeServiceTrait for BridgeService {
    async fn execute(&self, path: &str, raw_query: &str, limit: i64) -> AppResult<QueryResult> {
        // Validate before touching the registry so rejected text never reaches SQLite.
        let query = SqlValidator::ensure_select(raw_query)?;
        let query = SqlValidator::append_limit_textual(query, limit);

        let pool = self.registry.connect(path).await?;
        run_query(&pool, &query).await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "Query execution error");
            e
        })
    }

    async fn list_tables(&self, path: &str) -> AppResult<Vec<String>> {
        let pool = self.registry.connect(path).await?;
        list_tables_on(&pool).await
    }

    async fn describe_table(&self, path: &str, table: &str) -> AppResult<Vec<ColumnDescriptor>> {
        let pool = self.registry.connect(path).await?;
        Self::ensure_known_table(&pool, table).await?;
        describe_known_table(&pool, table).await
    }

    async fn get_table_count(&self, path: &str, table: &str) -> AppResult<i64> {
        let pool = self.registry.connect(path).await?;
        Self::ensure_known_table(&pool, table).await?;
        count_known_table(&pool, table).await
    }

    async fn get_database_info(&self) -> DatabaseInfo {
        let mut info = DatabaseInfo::new();
        for path in self.registry.configured_paths() {
            let report = if !Path::new(path).exists() {
                DatabaseReport::not_found()
            } else {
                match self.database_report(path).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "Database report failed");
                        DatabaseReport::error(e.to_string())
                    }
                }
            };
            info.insert(path.clone(), report);
        }
        info
    }
}

const MULTIPLE_STATEMENTS: &str = "You can only execute one statement at a time";

/// Prepares `query` for its column list, then fetches every row.
///
/// Columns come from the prepared statement so an empty result still
/// reports them. Text holding more than one statement is rejected as soon
/// as output from the second one shows up.
async fn run_query(pool: &SqlitePool, query: &str) -> AppResult<QueryResult> {
    let statement = pool.prepare(query).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut finished = false;
    let mut stream = pool.fetch_many(query);
    while let Some(step) = stream.try_next().await? {
        if finished {
            return Err(AppError::QueryExecution(MULTIPLE_STATEMENTS.to_string()));
        }
        match step {
            Either::Left(_) => finished = true,
            Either::Right(row) => rows.push(row_to_map(&row, &columns)?),
        }
    }

    Ok(QueryResult::new(query.to_string(), columns, rows))
}

async fn list_tables_on(pool: &SqlitePool) -> AppResult<Vec<String>> {
    let tables = sqlx::query_scalar::<_, String>("SELECT name FROM sqlite_master WHERE type='table'")
        .fetch_all(pool)
        .await?;
    Ok(tables)
}

/// Callers must have checked `table` against the catalog.
async fn describe_known_table(pool: &SqlitePool, table: &str) -> AppResult<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(
        "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> AppResult<ColumnDescriptor> {
            Ok(ColumnDescriptor {
                cid: row.try_get("cid")?,
                name: row.try_get("name")?,
                data_type: row.try_get::<Option<String>, _>("type")?.unwrap_or_default(),
                notnull: row.try_get("notnull")?,
                dflt_value: row.try_get("dflt_value")?,
                pk: row.try_get("pk")?,
            })
        })
        .collect()
}

/// Callers must have checked `table` against the catalog.
async fn count_known_table(pool: &SqlitePool, table: &str) -> AppResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {}",
        SqlValidator::quote_identifier(table)
    );
    let count = sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{registry_for, seed_database};
    use common::config::AppConfig;
    use common::models::schema::DatabaseStatus;
    use std::time::Duration;
    use tempfile::TempDir;

    const SPIKE_TRADES: &str = "CREATE TABLE spike_trades (
        trade_id TEXT PRIMARY KEY,
        symbol TEXT NOT NULL,
        side TEXT DEFAULT 'BUY',
        quantity REAL,
        pnl REAL
    )";

    async fn service_with_trades(dir: &TempDir, rows: usize) -> (BridgeService, String) {
        let mut statements = vec![SPIKE_TRADES.to_string()];
        for i in 0..rows {
            statements.push(format!(
                "INSERT INTO spike_trades VALUES ('t{i}', 'BTCUSDT', 'BUY', {i}.5, NULL)"
            ));
        }
        let statements: Vec<&str> = statements.iter().map(String::as_str).collect();
        let path = seed_database(dir, "trading_bot.db", &statements).await;
        let service = BridgeService::new(Arc::new(registry_for(&[&path])));
        (service, path)
    }

    #[tokio::test]
    async fn test_non_select_never_opens_a_handle() {
        let registry = Arc::new(registry_for(&[]));
        let service = BridgeService::new(registry.clone());

        for sql in ["DELETE FROM spike_trades", "  update t set x = 1", "PRAGMA foo"] {
            let err = service.execute("anything.db", sql, 100).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidQuery(_)));
        }
        assert_eq!(registry.open_count().await, 0);
    }

    #[tokio::test]
    async fn test_limit_is_appended() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 10).await;

        let result = service
            .execute(&path, "SELECT * FROM spike_trades;", 5)
            .await
            .unwrap();
        assert_eq!(result.query, "SELECT * FROM spike_trades LIMIT 5");
        assert_eq!(result.count, 5);
        assert_eq!(result.rows.len(), 5);
        assert_eq!(
            result.columns,
            ["trade_id", "symbol", "side", "quantity", "pnl"]
        );
    }

    #[tokio::test]
    async fn test_existing_limit_wins() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 10).await;

        let result = service
            .execute(&path, "select trade_id from spike_trades limit 3", 5)
            .await
            .unwrap();
        assert_eq!(result.query, "select trade_id from spike_trades limit 3");
        assert_eq!(result.count, 3);
    }

    #[tokio::test]
    async fn test_zero_limit_returns_everything() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 10).await;

        let result = service
            .execute(&path, "SELECT * FROM spike_trades", 0)
            .await
            .unwrap();
        assert_eq!(result.count, 10);
    }

    #[tokio::test]
    async fn test_empty_table_reports_columns() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 0).await;

        let result = service
            .execute(&path, "SELECT * FROM spike_trades", 100)
            .await
            .unwrap();
        assert_eq!(result.columns.len(), 5);
        assert!(result.rows.is_empty());
        assert_eq!(result.count, 0);
    }

    #[tokio::test]
    async fn test_rows_keep_values() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 2).await;

        let result = service
            .execute(&path, "SELECT trade_id, quantity, pnl FROM spike_trades", 100)
            .await
            .unwrap();
        let first = &result.rows[0];
        assert_eq!(first["trade_id"], "t0");
        assert_eq!(first["quantity"], 0.5);
        assert!(first["pnl"].is_null());
    }

    #[tokio::test]
    async fn test_execution_error_carries_engine_message() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 1).await;

        let err = service
            .execute(&path, "SELECT * FROM no_such_table", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueryExecution(_)));
        assert!(err.to_string().contains("no such table"));
    }

    #[tokio::test]
    async fn test_second_statement_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 10).await;

        let err = service
            .execute(&path, "SELECT trade_id FROM spike_trades; SELECT 'x' AS other", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueryExecution(_)));
        assert_eq!(err.to_string(), "You can only execute one statement at a time");

        // A lone trailing terminator is still one statement.
        let result = service
            .execute(&path, "SELECT trade_id FROM spike_trades;", 0)
            .await
            .unwrap();
        assert_eq!(result.count, 10);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_handle() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 10).await;

        let (first, second) = tokio::join!(
            service.execute(&path, "SELECT trade_id FROM spike_trades", 3),
            service.list_tables(&path)
        );
        assert_eq!(first.unwrap().count, 3);
        assert_eq!(second.unwrap(), ["spike_trades"]);
        assert_eq!(service.registry.open_count().await, 1);
    }

    #[tokio::test]
    async fn test_queued_request_outlasts_connect_timeout() {
        let dir = TempDir::new().unwrap();
        let path = seed_database(&dir, "slow.db", &[SPIKE_TRADES]).await;
        let registry = Arc::new(ConnectionRegistry::new(&AppConfig {
            databases: vec![path.clone()],
            connect_timeout_secs: 1,
            ..Default::default()
        }));
        let service = BridgeService::new(registry.clone());
        service.list_tables(&path).await.unwrap();

        let slow = {
            let service = BridgeService::new(registry.clone());
            let path = path.clone();
            tokio::spawn(async move {
                service
                    .execute(
                        &path,
                        "SELECT COUNT(*) AS n FROM (WITH RECURSIVE c(x) AS \
                         (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 20000000) \
                         SELECT x FROM c)",
                        0,
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;

        let quick = service
            .execute(&path, "SELECT trade_id FROM spike_trades", 100)
            .await
            .unwrap();
        assert_eq!(quick.count, 0);

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.rows[0]["n"], 20_000_000);
    }

    #[tokio::test]
    async fn test_table_names_ignore_case() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 3).await;

        assert_eq!(service.get_table_count(&path, "SPIKE_TRADES").await.unwrap(), 3);
        let columns = service.describe_table(&path, "Spike_Trades").await.unwrap();
        assert_eq!(columns.len(), 5);
    }

    #[tokio::test]
    async fn test_introspection() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 4).await;

        assert_eq!(service.list_tables(&path).await.unwrap(), ["spike_trades"]);
        assert_eq!(service.get_table_count(&path, "spike_trades").await.unwrap(), 4);

        let columns = service.describe_table(&path, "spike_trades").await.unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].name, "trade_id");
        assert_eq!(columns[0].pk, 1);
        assert_eq!(columns[1].notnull, 1);
        assert_eq!(columns[2].notnull, 0);
        assert_eq!(columns[2].dflt_value.as_deref(), Some("'BUY'"));
        assert_eq!(columns[3].data_type, "REAL");
    }

    #[tokio::test]
    async fn test_unknown_table_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with_trades(&dir, 1).await;

        let err = service
            .get_table_count(&path, "spike_trades; DROP TABLE spike_trades")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.describe_table(&path, "ghosts").await.is_err());
    }

    #[tokio::test]
    async fn test_database_info_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let good = seed_database(&dir, "good.db", &[SPIKE_TRADES]).await;
        let missing = dir.path().join("missing.db").to_string_lossy().into_owned();
        let garbage = dir.path().join("garbage.db");
        std::fs::write(&garbage, b"this is not a sqlite file at all, just text").unwrap();
        let garbage = garbage.to_string_lossy().into_owned();

        let service = BridgeService::new(Arc::new(registry_for(&[&good, &missing, &garbage])));
        let info = service.get_database_info().await;

        assert_eq!(info.len(), 3);
        let report = info.get(&good).unwrap();
        assert_eq!(report.status, DatabaseStatus::Connected);
        assert_eq!(report.tables.as_deref().unwrap(), ["spike_trades"]);
        assert_eq!(report.table_info.as_ref().unwrap()["spike_trades"].row_count, 0);
        assert!(report.file_size.unwrap() > 0);
        assert!(report.last_modified.unwrap() > 0.0);

        assert_eq!(info.get(&missing).unwrap().status, DatabaseStatus::NotFound);
        let broken = info.get(&garbage).unwrap();
        assert_eq!(broken.status, DatabaseStatus::Error);
        assert!(broken.error.is_some());
    }
}
