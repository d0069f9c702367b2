//! Database connection registry.
//!
//! Keeps one handle per database file path for the life of the server.
//! Each handle is a single-connection SQLite pool opened read-only, so all
//! requests against a path share the same underlying connection.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::RwLock;

/// Upper bound on waiting for a handle that another query is using.
const CHECKOUT_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lazily opened, cached handles keyed by database path.
///
/// No eviction: the registry grows with distinct paths until [`close_all`]
/// runs at shutdown.
///
/// [`close_all`]: ConnectionRegistry::close_all
pub struct ConnectionRegistry {
    /// Operator-supplied paths, in command line order.
    configured: Vec<String>,
    /// Reject paths outside `configured`.
    strict: bool,
    connect_timeout: Duration,
    handles: RwLock<HashMap<String, SqlitePool>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry for the configured paths.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            configured: config.databases.clone(),
            strict: config.strict_paths,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Database paths given at startup.
    pub fn configured_paths(&self) -> &[String] {
        &self.configured
    }

    /// Returns the handle for `path`, opening it on first use.
    ///
    /// # Errors
    /// `AppError::NotFound` if the file does not exist (or is not configured
    /// in strict mode), `AppError::DatabaseConnection` if SQLite cannot open it.
    pub async fn connect(&self, path: &str) -> AppResult<SqlitePool> {
        if let Some(pool) = self.handles.read().await.get(path) {
            return Ok(pool.clone());
        }

        if self.strict && !self.configured.iter().any(|p| p == path) {
            return Err(AppError::NotFound(format!(
                "Database not configured: {}",
                path
            )));
        }
        if !Path::new(path).exists() {
            return Err(AppError::database_not_found(path));
        }

        // Opened outside the lock so cached paths stay reachable meanwhile.
        let pool = self.open(path).await?;

        let existing = {
            let mut handles = self.handles.write().await;
            match handles.entry(path.to_string()) {
                Entry::Occupied(entry) => Some(entry.get().clone()),
                Entry::Vacant(entry) => {
                    entry.insert(pool.clone());
                    None
                }
            }
        };

        match existing {
            Some(winner) => {
                // Another request opened the same path first.
                pool.close().await;
                Ok(winner)
            }
            None => {
                tracing::info!(path = %path, "Connected to database");
                Ok(pool)
            }
        }
    }

    /// Opens a read-only single-connection pool.
    ///
    /// `connect_timeout` bounds only the open itself. Later checkouts wait
    /// for the shared connection as long as the query ahead of them runs.
    async fn open(&self, path: &str) -> AppResult<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pending = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CHECKOUT_WAIT)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options);

        match tokio::time::timeout(self.connect_timeout, pending).await {
            Ok(Ok(pool)) => Ok(pool),
            Ok(Err(e)) => {
                tracing::warn!(path = %path, error = %e, "Failed to open database");
                Err(AppError::DatabaseConnection(format!(
                    "Failed to open database {}: {}",
                    path, e
                )))
            }
            Err(_) => {
                tracing::warn!(path = %path, "Timed out opening database");
                Err(AppError::DatabaseConnection(format!(
                    "Timed out opening database {}",
                    path
                )))
            }
        }
    }

    /// Number of open handles.
    pub async fn open_count(&self) -> usize {
        self.handles.read().await.len()
    }

    /// Closes and forgets every cached handle. Safe to call more than once.
    pub async fn close_all(&self) {
        let handles: Vec<(String, SqlitePool)> = self.handles.write().await.drain().collect();
        for (path, pool) in handles {
            pool.close().await;
            tracing::info!(path = %path, "Closed connection");
        }
    }
}
