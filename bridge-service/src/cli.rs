//! Command line interface.

use clap::Parser;

use common::config::{AppConfig, LogFormat, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROW_LIMIT};

#[derive(Parser, Debug)]
#[command(name = "sqlite-bridge")]
#[command(version, about = "Read-only SQL-over-HTTP bridge for SQLite database files", long_about = None)]
pub struct Cli {
    /// SQLite database files to serve
    #[arg(required = true, value_name = "DB_PATH")]
    pub databases: Vec<String>,

    /// Port to listen on
    #[arg(long, env = "BRIDGE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind
    #[arg(long, env = "BRIDGE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Only serve the database files listed on the command line
    #[arg(long, env = "BRIDGE_STRICT_PATHS")]
    pub strict: bool,

    /// Row cap applied when a query request gives no limit (0 or less disables it)
    #[arg(long, env = "BRIDGE_DEFAULT_LIMIT", default_value_t = DEFAULT_ROW_LIMIT, allow_negative_numbers = true)]
    pub default_limit: i64,

    /// Seconds to wait when opening a database file
    #[arg(long, env = "BRIDGE_CONNECT_TIMEOUT", default_value_t = 5)]
    pub connect_timeout: u64,

    /// Log output format (pretty or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn into_config(self, service_name: &str) -> AppConfig {
        AppConfig {
            host: self.host,
            port: self.port,
            databases: self.databases,
            strict_paths: self.strict,
            default_limit: self.default_limit,
            connect_timeout_secs: self.connect_timeout,
            log_format: self.log_format,
            ..AppConfig::with_service(service_name)
        }
    }
}
