//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::{PipelineError, Result};

/// Which broker implementation the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    /// Process-local broker; nothing leaves the process.
    Memory,
    /// A Kafka cluster at `bootstrap_servers`. Requires the `kafka` feature.
    Kafka,
}

impl std::str::FromStr for BrokerKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BrokerKind::Memory),
            "kafka" => Ok(BrokerKind::Kafka),
            other => Err(PipelineError::Config(format!(
                "BROKER must be `memory` or `kafka`, got `{other}`"
            ))),
        }
    }
}

/// Pipeline configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BROKER`: `memory` or `kafka` (default: `memory`)
/// - `BOOTSTRAP_SERVERS`: Kafka bootstrap servers (default: `PLAINTEXT://kafka0:9092`)
/// - `KSQL_URL`: query engine base URL; the in-memory engine is used when unset
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `ADMIN_TIMEOUT_MS`: topic listing and creation timeout (default: `5000`)
/// - `FLUSH_TIMEOUT_MS`: producer flush timeout on close (default: `10000`)
/// - `PUBLISH_INTERVAL_MS`: time between simulation ticks (default: `1000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub broker: BrokerKind,
    pub bootstrap_servers: String,
    pub ksql_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub admin_timeout: Duration,
    pub flush_timeout: Duration,
    pub publish_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// Unparsable numbers fall back to their defaults; an unknown broker
    /// kind is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Ok(Self {
            broker: match lookup("BROKER") {
                Some(kind) => kind.parse()?,
                None => defaults.broker,
            },
            bootstrap_servers: lookup("BOOTSTRAP_SERVERS").unwrap_or(defaults.bootstrap_servers),
            ksql_url: lookup("KSQL_URL").filter(|url| !url.trim().is_empty()),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            admin_timeout: millis("ADMIN_TIMEOUT_MS", defaults.admin_timeout),
            flush_timeout: millis("FLUSH_TIMEOUT_MS", defaults.flush_timeout),
            publish_interval: millis("PUBLISH_INTERVAL_MS", defaults.publish_interval),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: BrokerKind::Memory,
            bootstrap_servers: "PLAINTEXT://kafka0:9092".to_string(),
            ksql_url: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            admin_timeout: Duration::from_millis(5000),
            flush_timeout: Duration::from_millis(10_000),
            publish_interval: Duration::from_millis(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.broker, BrokerKind::Memory);
        assert_eq!(config.bootstrap_servers, "PLAINTEXT://kafka0:9092");
        assert_eq!(config.ksql_url, None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.admin_timeout, Duration::from_secs(5));
        assert_eq!(config.flush_timeout, Duration::from_secs(10));
        assert_eq!(config.publish_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BROKER", "Kafka"),
            ("KSQL_URL", "http://ksql:8088"),
            ("PORT", "8080"),
            ("FLUSH_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.broker, BrokerKind::Kafka);
        assert_eq!(config.ksql_url.as_deref(), Some("http://ksql:8088"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.flush_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config =
            Config::from_lookup(lookup(&[("PORT", "http"), ("ADMIN_TIMEOUT_MS", "-1")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.admin_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_ksql_url_is_unset() {
        let config = Config::from_lookup(lookup(&[("KSQL_URL", "  ")])).unwrap();
        assert_eq!(config.ksql_url, None);
    }

    #[test]
    fn test_unknown_broker_is_rejected() {
        let result = Config::from_lookup(lookup(&[("BROKER", "rabbit")]));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
