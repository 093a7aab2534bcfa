//! Config module - Manages modelfs configuration (modelfs.toml).
//!
//! Configuration file contains:
//! - Local storage directory and content folder
//! - Remote (durable) storage location
//! - Record database path
//! - Log level

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::context::DEFAULT_CONTENT_DIR;

/// Durable storage behind the local cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Directory used by the local provider
    #[serde(default = "default_remote_path")]
    pub path: PathBuf,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            path: default_remote_path(),
        }
    }
}

/// Record / JSON database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// SQLite file (default: `<storage_dir>/modelfs.db`)
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for the `modelfs` target (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main modelfs configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config version (for future migrations)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Local cache directory
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Folder below `storage_dir` holding resource folders
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Tenant id, part of every folder name and JSON scope
    #[serde(default)]
    pub company_id: i64,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> u32 {
    1
}

fn default_content_dir() -> String {
    DEFAULT_CONTENT_DIR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            storage_dir: default_storage_dir(),
            content_dir: default_content_dir(),
            company_id: 0,
            remote: RemoteConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("modelfs"))
        .unwrap_or_else(|| PathBuf::from("./modelfs"))
}

/// Default local cache directory
pub fn default_storage_dir() -> PathBuf {
    data_root().join("storage")
}

/// Default remote directory for the local provider
pub fn default_remote_path() -> PathBuf {
    data_root().join("remote")
}

/// Default config directory (~/.config/modelfs/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("modelfs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("modelfs.toml")
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with a specific storage directory
    pub fn with_storage_dir(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir,
            ..Self::default()
        }
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from the default path, falling back to defaults
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save config to the default path
    pub fn save_default(&self) -> Result<PathBuf> {
        let path = default_config_path();
        self.save(&path)?;
        Ok(path)
    }

    /// SQLite file for records and JSON values
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.storage_dir.join("modelfs.db"))
    }

    /// Local root of all resource folders
    pub fn content_path(&self) -> PathBuf {
        self.storage_dir.join(&self.content_dir)
    }
}
