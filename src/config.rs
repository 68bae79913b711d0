//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{IngestError, Result};
use crate::writer::options::WriteOptions;

/// Environment variable that overrides the store token
pub const TOKEN_ENV_VAR: &str = "SONDE_INGEST_TOKEN";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub writer: WriteOptions,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub token: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for rolling log files; console only when empty
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_host() -> String { "http://localhost:8181".to_string() }
fn default_database() -> String { "test".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            database: default_database(),
            token: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sonde_ingest::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the store token with `token` when it is set and non-empty
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.store.token = token;
        }
        self
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.store.host.is_empty() {
            return Err(IngestError::Config(
                toml::de::Error::custom("store host cannot be empty")
            ));
        }

        if !self.store.host.starts_with("http://") && !self.store.host.starts_with("https://") {
            return Err(IngestError::Config(
                toml::de::Error::custom("store host must start with http:// or https://")
            ));
        }

        if self.store.database.is_empty() {
            return Err(IngestError::Config(
                toml::de::Error::custom("store database cannot be empty")
            ));
        }

        if self.store.timeout_ms == 0 || self.store.timeout_ms > 60000 {
            return Err(IngestError::Config(
                toml::de::Error::custom("timeout_ms must be between 1 and 60000")
            ));
        }

        self.writer.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.host, "http://localhost:8181");
        assert_eq!(config.writer, WriteOptions::default());
        assert!(config.logging.dir.is_empty());
    }

    #[test]
    fn test_empty_toml_matches_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.store.database, "test");
        assert_eq!(config.store.timeout_ms, 10_000);
        assert_eq!(config.writer.batch_size, 500);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[store]
host = "https://influx.example.org"
database = "ocean"
token = "abc"

[writer]
batch_size = 100
max_retries = 3

[logging]
dir = "/var/log/sonde"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.store.host, "https://influx.example.org");
        assert_eq!(config.store.database, "ocean");
        assert_eq!(config.store.token, "abc");
        assert_eq!(config.writer.batch_size, 100);
        assert_eq!(config.writer.max_retries, 3);
        assert_eq!(config.writer.retry_interval_ms, 5_000);
        assert_eq!(config.logging.dir, "/var/log/sonde");
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[writer]\nbatch_size = \"many\"\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(Config::load("/nonexistent/sonde.toml"), Err(IngestError::Io(_))));
    }

    #[test]
    fn test_load_rejects_invalid_writer_options() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[writer]\nbatch_size = 0\n").unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_empty_host() {
        let mut config = Config::default();
        config.store.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_without_scheme() {
        let mut config = Config::default();
        config.store.host = "localhost:8181".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_database() {
        let mut config = Config::default();
        config.store.database = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = Config::default();
        config.store.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = Config::default();
        config.store.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_override() {
        let config = Config::default().with_token_override(Some("from-env".to_string()));
        assert_eq!(config.store.token, "from-env");
    }

    #[test]
    fn test_empty_token_override_is_ignored() {
        let mut config = Config::default();
        config.store.token = "from-file".to_string();

        let config = config.with_token_override(Some(String::new()));
        assert_eq!(config.store.token, "from-file");

        let config = config.with_token_override(None);
        assert_eq!(config.store.token, "from-file");
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_host(), "http://localhost:8181");
        assert_eq!(default_database(), "test");
        assert_eq!(default_timeout_ms(), 10_000);
    }
}
