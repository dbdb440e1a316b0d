//! Configuration loading and typed config structures for VoltDash.
//!
//! The configuration lives in `voltdash-config.yaml` at the project root.
//! Every field has a default, so a missing file or a partial file is valid.
//! A handful of deployment settings can be overridden from the environment.

use std::path::Path;

use serde::Deserialize;
use voltdash_types::TimestampFormat;

use crate::controller::{ControllerConfig, DEFAULT_QUEUE_CAPACITY};

/// Environment name that selects the local credentials file.
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `voltdash-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoltDashConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Tick loop settings.
    #[serde(default)]
    pub simulation: SimulationSection,

    /// History query and retention settings.
    #[serde(default)]
    pub history: HistorySection,

    /// Cross-origin settings for the dashboard.
    #[serde(default)]
    pub cors: CorsSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Deployment environment and credential source.
    #[serde(default)]
    pub infrastructure: InfrastructureSection,

    /// Controller task settings.
    #[serde(default)]
    pub controller: ControllerSection,
}

impl VoltDashConfig {
    /// Load configuration from a YAML file and apply environment overrides:
    /// - `PORT` overrides `server.port`
    /// - `ENVIRONMENT` overrides `infrastructure.environment`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::InvalidEnv`] if `PORT` is not a port number.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `PORT` is not a port number.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("PORT") {
            self.server.port = value
                .trim()
                .parse()
                .map_err(|_err| ConfigError::InvalidEnv { name: "PORT", value })?;
        }
        if let Some(value) = lookup("ENVIRONMENT") {
            self.infrastructure.environment = value;
        }
        Ok(())
    }

    /// Controller settings assembled from the `controller`, `simulation` and
    /// `history` sections.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            queue_capacity: self.controller.queue_capacity,
            record_history: self.simulation.record_history,
            retention_limit: self.history.retention_limit,
            prune_interval_ticks: self.history.prune_interval_ticks,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Tick loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSection {
    /// Milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Append a history snapshot on every committed tick.
    #[serde(default = "default_true")]
    pub record_history: bool,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            record_history: true,
        }
    }
}

/// History query and retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistorySection {
    /// Rows returned when the caller gives no `limit`.
    #[serde(default = "default_history_limit")]
    pub default_limit: usize,

    /// Largest `limit` honored; larger requests are capped.
    #[serde(default = "default_max_history_limit")]
    pub max_limit: usize,

    /// Snapshots kept after pruning.
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,

    /// Prune every N committed ticks (0 disables pruning).
    #[serde(default = "default_prune_interval_ticks")]
    pub prune_interval_ticks: u64,

    /// Timestamp rendering when the caller gives no `format`.
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
}

impl HistorySection {
    /// Resolve a caller-supplied limit against the configured default and cap.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
            max_limit: default_max_history_limit(),
            retention_limit: default_retention_limit(),
            prune_interval_ticks: default_prune_interval_ticks(),
            timestamp_format: TimestampFormat::default(),
        }
    }
}

/// Cross-origin settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CorsSection {
    /// Origins allowed to call the API. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes
    /// precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Deployment environment and credential source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureSection {
    /// Deployment environment name.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Credentials file read in the development environment.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
}

impl InfrastructureSection {
    /// Whether credentials come from the local file.
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEVELOPMENT_ENVIRONMENT)
    }
}

impl Default for InfrastructureSection {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            credentials_file: default_credentials_file(),
        }
    }
}

/// Controller task settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerSection {
    /// Capacity of the request queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5001
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_true() -> bool {
    true
}

const fn default_history_limit() -> usize {
    10
}

const fn default_max_history_limit() -> usize {
    1000
}

const fn default_retention_limit() -> usize {
    86_400
}

const fn default_prune_interval_ticks() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_environment() -> String {
    "production".to_owned()
}

fn default_credentials_file() -> String {
    "voltdash-credentials.json".to_owned()
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VoltDashConfig::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.simulation.tick_interval_ms, 1000);
        assert!(config.simulation.record_history);
        assert_eq!(config.history.default_limit, 10);
        assert_eq!(config.history.timestamp_format, TimestampFormat::Epoch);
        assert!(config.cors.allowed_origins.is_empty());
        assert!(!config.infrastructure.is_development());
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = VoltDashConfig::parse("{}").unwrap();
        assert_eq!(config, VoltDashConfig::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080

simulation:
  tick_interval_ms: 500
  record_history: false

history:
  default_limit: 25
  max_limit: 200
  retention_limit: 3600
  prune_interval_ticks: 10
  timestamp_format: iso8601

cors:
  allowed_origins:
    - "http://localhost:3000"

logging:
  level: "debug"
  json: true

infrastructure:
  environment: "development"
  credentials_file: "creds.json"

controller:
  queue_capacity: 16
"#;

        let config = VoltDashConfig::parse(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.simulation.tick_interval_ms, 500);
        assert_eq!(config.history.timestamp_format, TimestampFormat::Iso8601);
        assert_eq!(config.cors.allowed_origins.len(), 1);
        assert!(config.logging.json);
        assert!(config.infrastructure.is_development());

        let controller = config.controller_config();
        assert_eq!(controller.queue_capacity, 16);
        assert!(!controller.record_history);
        assert_eq!(controller.retention_limit, 3600);
        assert_eq!(controller.prune_interval_ticks, 10);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = VoltDashConfig::parse("history:\n  max_limit: 50\n").unwrap();
        assert_eq!(config.history.max_limit, 50);
        assert_eq!(config.history.default_limit, 10);
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = VoltDashConfig::parse("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn env_overrides_port_and_environment() {
        let mut config = VoltDashConfig::default();
        config
            .apply_env_overrides(|name| match name {
                "PORT" => Some("9000".to_owned()),
                "ENVIRONMENT" => Some("development".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(config.infrastructure.is_development());
    }

    #[test]
    fn invalid_port_override_is_rejected() {
        let mut config = VoltDashConfig::default();
        let result = config.apply_env_overrides(|name| {
            (name == "PORT").then(|| "not-a-port".to_owned())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "PORT", .. })
        ));
    }

    #[test]
    fn history_limit_is_defaulted_and_capped() {
        let history = HistorySection::default();
        assert_eq!(history.effective_limit(None), 10);
        assert_eq!(history.effective_limit(Some(5)), 5);
        assert_eq!(history.effective_limit(Some(5000)), 1000);
    }
}
