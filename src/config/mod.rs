/// Configuration management for kvbridge
pub mod settings;
pub mod ssh;
pub mod store;

pub use settings::{
    content_hash, BackendConfig, ClusterSettings, ConnectionIdentity, ConnectionSettings,
    HostAndPort, LocalConfig, RemoteConfig, SentinelEntry, SentinelSettings, NODE_DELIMITER,
};
pub use ssh::{SshAuthMethod, SshInfo};
pub use store::SettingsStore;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main kvbridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Persisted connection strings
    #[serde(default)]
    pub connections: Vec<String>,
    /// Persisted cluster strings
    #[serde(default)]
    pub clusters: Vec<String>,
    /// Persisted sentinel group strings
    #[serde(default)]
    pub sentinels: Vec<String>,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// History log configuration
    pub history: HistoryConfig,
    /// Driver configuration
    pub driver: DriverConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

/// History log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding one `<hash><ext>` file per connection
    pub directory: String,
    /// Disable to skip periodic snapshots altogether
    pub enabled: bool,
}

/// Driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Maximum number of MOVED/ASK redirects followed per request
    pub max_redirects: u8,
    /// Logging interval applied to connections created from the CLI
    pub default_logging_interval_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
            clusters: Vec::new(),
            sentinels: Vec::new(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
            history: HistoryConfig {
                directory: "history".to_string(),
                enabled: true,
            },
            driver: DriverConfig {
                max_redirects: 3,
                default_logging_interval_ms: 0,
            },
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}",
                    self.logging.format
                )))
            }
        }

        if self.history.enabled && self.history.directory.is_empty() {
            return Err(ConfigError::ValidationError(
                "history directory cannot be empty when history is enabled".to_string(),
            ));
        }

        if self.driver.max_redirects == 0 {
            return Err(ConfigError::ValidationError(
                "max_redirects must be greater than 0".to_string(),
            ));
        }

        // Every persisted string must parse
        for connection in &self.connections {
            ConnectionSettings::from_connection_string(connection)?;
        }
        for cluster in &self.clusters {
            ClusterSettings::from_connection_string(cluster)?;
        }
        for sentinel in &self.sentinels {
            SentinelSettings::from_connection_string(sentinel)?;
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P, kind: &str) -> Result<(), ConfigError> {
        let connection = match kind {
            "redis" => ConnectionSettings::new(
                "local redis",
                crate::core::BackendKind::Redis,
                BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("127.0.0.1", 6379))),
            )?
            .with_logging_interval(5000),
            "embedded" => ConnectionSettings::new(
                "scratch",
                crate::core::BackendKind::Embedded,
                BackendConfig::Local(LocalConfig::new("scratch.toml")),
            )?,
            _ => {
                return Err(ConfigError::ValidationError(
                    "Kind must be 'redis' or 'embedded'".to_string(),
                ))
            }
        };

        let config = Config {
            connections: vec![connection.to_connection_string()],
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found master for {0}")]
    MissingMaster(String),

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.driver.max_redirects = 0;
        assert!(config.validate().is_err());

        config.driver.max_redirects = 5;
        assert!(config.validate().is_ok());

        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_connection_string_fails_validation() {
        let config = Config {
            connections: vec!["not,a,connection".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed_config: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed_config.validate().is_ok());
    }

    #[test]
    fn test_example_config_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();

        Config::create_example_config(temp_file.path(), "redis").unwrap();
        let loaded = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.connections.len(), 1);

        let settings = ConnectionSettings::from_connection_string(&loaded.connections[0]).unwrap();
        assert_eq!(settings.name(), "local redis");
        assert_eq!(settings.logging_interval_ms(), 5000);

        assert!(Config::create_example_config(temp_file.path(), "mongodb").is_err());
    }
}
