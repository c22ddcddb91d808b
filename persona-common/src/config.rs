//! Configuration loading for Persona services
//!
//! TOML config is the lowest tier of the Database → ENV → TOML resolution
//! performed by each service; this module only defines the file format and
//! the read/write helpers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (e.g. "info", "persona_ae=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// TOML configuration file contents
///
/// All fields are optional; absent values fall through to the next
/// resolution tier or to compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Analyzer workflow engine API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer_api_key: Option<String>,
    /// Analyzer base URL (e.g. "https://api.example.com/v1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer_base_url: Option<String>,
    /// Analyzer workflow identifier for analysis runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer_workflow_id: Option<String>,
    /// Analyzer call timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer_timeout_secs: Option<u64>,
    /// Path to the SQLite database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Read TOML config from the given path
///
/// A missing file is not an error; it yields the default (empty) config.
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write TOML config to the given path, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Create config dir failed: {}", e)))?;
    }

    std::fs::write(path, content).map_err(|e| Error::Config(format!("Write TOML failed: {}", e)))
}
