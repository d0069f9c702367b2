//! Runtime configuration.
//!
//! The service binary fills an [`AppConfig`] from its command line (which in
//! turn falls back to environment variables). Everything here has a sensible
//! default so tests can build a config with struct update syntax.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default listening host.
pub const DEFAULT_HOST: &str = "localhost";

/// Row cap applied when a request does not name one.
pub const DEFAULT_ROW_LIMIT: i64 = 100;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Bridge configuration shared by the server and its handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and the capability document.
    pub service_name: String,
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Operator-supplied database file paths, in command line order.
    pub databases: Vec<String>,
    /// Only serve the configured paths when set.
    pub strict_paths: bool,
    /// Row cap used when a query request omits `limit`.
    pub default_limit: i64,
    /// Timeout for opening a database handle.
    pub connect_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "sqlite-bridge".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            databases: Vec::new(),
            strict_paths: false,
            default_limit: DEFAULT_ROW_LIMIT,
            connect_timeout_secs: 5,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Creates a default config carrying the given service name.
    pub fn with_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            ..Default::default()
        }
    }

    /// The `host:port` string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load a `.env` file from the working directory (best-effort, no error if missing).
///
/// Variables already present in the environment win over the file.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let Ok(content) = std::fs::read_to_string(env_path) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

/// Parses `KEY=VALUE` lines, skipping blanks and `#` comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.default_limit, 100);
        assert!(!config.strict_paths);
        assert_eq!(config.bind_address(), "localhost:8080");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_parse_dotenv_skips_comments() {
        let parsed = parse_dotenv("# comment\n\nBRIDGE_PORT = 9000\nLOG_FORMAT=\"json\"\nnot a pair\n");
        assert_eq!(parsed, vec![("BRIDGE_PORT", "9000"), ("LOG_FORMAT", "json")]);
    }
}
