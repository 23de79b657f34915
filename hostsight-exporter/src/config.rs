//! Configuration for the exporter.

use hostsight_collector::CollectionConfig;
use hostsight_common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Prometheus endpoint settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Collection cadence, sources and filters.
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:9108").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Default labels to add to all metrics.
    #[serde(default)]
    pub default_labels: HashMap<String, String>,

    /// Metric name prefix (default: "game").
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_listen() -> String {
    "0.0.0.0:9108".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_prefix() -> String {
    "game".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            default_labels: HashMap::new(),
            prefix: default_prefix(),
        }
    }
}

impl PrometheusConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::Validation(format!("Invalid listen address: {}", self.listen))
        })
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.prometheus.listen_addr()?;

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if matches!(self.prometheus.path.as_str(), "/health" | "/ready" | "/snapshot") {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} collides with a built-in endpoint",
                self.prometheus.path
            )));
        }

        if self.prometheus.prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Metric prefix must not be empty".to_string(),
            ));
        }

        self.collection
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostsight_collector::CounterMode;
    use hostsight_common::LogFormat;

    #[test]
    fn test_parse_minimal_config() {
        let json = "{}";
        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.prometheus.listen, "0.0.0.0:9108");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.prometheus.prefix, "game");
        assert_eq!(config.collection.interval_secs, 5);
        assert_eq!(config.collection.counter_mode, CounterMode::Cumulative);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            prometheus: {
                listen: "127.0.0.1:9200",
                path: "/prometheus/metrics",
                prefix: "host",
                default_labels: {
                    environment: "production",
                    datacenter: "eu-west-1"
                }
            },
            collection: {
                interval_secs: 10,
                counter_mode: "delta",
                collect: { connections: false },
                disk: { exclude: ["/snap/*"] }
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.prometheus.listen, "127.0.0.1:9200");
        assert_eq!(
            config.prometheus.listen_addr().unwrap(),
            "127.0.0.1:9200".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.prometheus.path, "/prometheus/metrics");
        assert_eq!(config.prometheus.prefix, "host");
        assert_eq!(
            config.prometheus.default_labels.get("environment"),
            Some(&"production".to_string())
        );
        assert_eq!(config.collection.interval_secs, 10);
        assert_eq!(config.collection.counter_mode, CounterMode::Delta);
        assert!(!config.collection.collect.connections);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            prometheus: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let json = r#"{
            prometheus: { path: "no-leading-slash" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_validate_reserved_path() {
        let json = r#"{
            prometheus: { path: "/health" }
        }"#;

        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let json = r#"{
            prometheus: { prefix: "" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.unwrap_err().to_string().contains("prefix"));
    }

    #[test]
    fn test_validate_collection_errors_surface() {
        let json = r#"{
            collection: { source_timeout_secs: 0 }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("source_timeout_secs")
        );
    }

    #[test]
    fn test_parse_error() {
        let result = ExporterConfig::parse("{ prometheus: ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
