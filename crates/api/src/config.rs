//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory ledgers when unset
/// - `DB_CONNECT_ATTEMPTS`: connection attempts before giving up (default: `10`)
/// - `DB_CONNECT_DELAY_SECS`: pause between attempts (default: `5`)
/// - `DB_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `STOCKS_SEED_PATH`: JSON file with initial stock levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub db_connect_attempts: u32,
    pub db_connect_delay: Duration,
    pub db_max_connections: u32,
    pub stocks_seed_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; empty strings count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: get("DATABASE_URL"),
            db_connect_attempts: get("DB_CONNECT_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.db_connect_attempts),
            db_connect_delay: get("DB_CONNECT_DELAY_SECS")
                .and_then(|n| n.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.db_connect_delay),
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.db_max_connections),
            stocks_seed_path: get("STOCKS_SEED_PATH").map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            db_connect_attempts: 10,
            db_connect_delay: Duration::from_secs(5),
            db_max_connections: 10,
            stocks_seed_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.db_connect_attempts, 10);
        assert_eq!(config.db_connect_delay, Duration::from_secs(5));
        assert!(config.database_url().is_none());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://loms:loms@db:5432/loms"),
            ("DB_CONNECT_ATTEMPTS", "3"),
            ("DB_CONNECT_DELAY_SECS", "1"),
            ("DB_MAX_CONNECTIONS", "25"),
            ("STOCKS_SEED_PATH", "/etc/loms/stocks.json"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url(),
            Some("postgres://loms:loms@db:5432/loms")
        );
        assert_eq!(config.db_connect_attempts, 3);
        assert_eq!(config.db_connect_delay, Duration::from_secs(1));
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(
            config.stocks_seed_path,
            Some(PathBuf::from("/etc/loms/stocks.json"))
        );
    }

    #[test]
    fn test_bad_numbers_and_blanks_fall_back() {
        let config = from_pairs(&[
            ("PORT", "http"),
            ("DATABASE_URL", "  "),
            ("LOG_FORMAT", "xml"),
        ]);
        assert_eq!(config.port, 3000);
        assert!(config.database_url().is_none());
        assert_eq!(config.log_format, LogFormat::Text);
    }
}
