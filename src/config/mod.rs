//! Configuration management for mongo-ferry
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments (applied by the `cli` module)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! The resulting [`Config`] is built once at process entry and handed to each
//! component by reference.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable holding the default connection string.
pub const ENV_MONGODB_URI: &str = "MONGODB_URI";

/// Environment variable overriding the batch size.
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";

/// Environment variable overriding the cluster registry path.
pub const ENV_CLUSTERS: &str = "MONGO_FERRY_CLUSTERS";

/// Environment variable overriding the log level.
pub const ENV_LOG: &str = "MONGO_FERRY_LOG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Batch transfer configuration
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Cluster registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Default MongoDB connection URI
    #[serde(default = "default_uri")]
    pub default_uri: String,

    /// Connection and server selection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Batch transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Documents per batch for reads, writes and inserts
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// What a backup does with an existing destination file
    #[serde(default)]
    pub write_policy: WritePolicy,

    /// Show a progress bar during transfers
    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,
}

/// Policy applied to an existing destination file before a backup writes to it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Keep existing lines and add new ones after them.
    ///
    /// Running the same backup twice doubles the file.
    #[default]
    Append,

    /// Empty the destination file before the first batch is written.
    Truncate,
}

/// Cluster registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the YAML file mapping cluster aliases to URIs
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_app_name() -> String {
    "mongo-ferry".to_string()
}

fn default_batch_size() -> usize {
    512
}

fn default_progress_bar() -> bool {
    true
}

fn config_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mongo-ferry")
}

fn default_registry_path() -> PathBuf {
    config_home().join("clusters.yml")
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_uri: default_uri(),
            timeout: default_timeout(),
            app_name: default_app_name(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            write_policy: WritePolicy::default(),
            progress_bar: default_progress_bar(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from file and the process environment
    ///
    /// # Arguments
    /// * `path` - Explicit config file. When `None` the default path is used
    ///   if it exists, otherwise defaults apply.
    ///
    /// # Returns
    /// * `Result<Config>` - Merged configuration or error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// An explicit path that does not exist is an error. The default path
    /// is optional.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Apply environment overrides using the given lookup function
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of an environment variable, if set
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_MONGODB_URI).filter(|v| !v.trim().is_empty()) {
            self.connection.default_uri = uri;
        }

        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            self.transfer.batch_size =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: ENV_BATCH_SIZE.to_string(),
                        value: raw.clone(),
                    })?;
        }

        if let Some(path) = lookup(ENV_CLUSTERS).filter(|v| !v.trim().is_empty()) {
            self.registry.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_LOG) {
            self.logging.level = LogLevel::parse(&raw).ok_or(ConfigError::InvalidValue {
                field: ENV_LOG.to_string(),
                value: raw.clone(),
            })?;
        }

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        config_home().join("config.toml")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.transfer.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.batch_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        self.connection.validate_uri()
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}

impl ConnectionConfig {
    /// Check that the default URI looks like a MongoDB connection string
    pub fn validate_uri(&self) -> Result<()> {
        validate_uri(&self.default_uri)
    }
}

/// Check that a connection string uses a MongoDB scheme
pub fn validate_uri(uri: &str) -> Result<()> {
    let uri = uri.trim();
    if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "connection.default_uri".to_string(),
            value: uri.to_string(),
        }
        .into())
    }
}

impl LogLevel {
    /// Parse a level name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
