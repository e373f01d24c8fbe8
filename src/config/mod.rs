//! Configuration management for songflow
//!
//! Handles the ~/.songflow/ directory structure and config.toml.
//! Set `SONGFLOW_HOME` to use a different root.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Default tracing filter when `SONGFLOW_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            workflow: WorkflowSettings::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowSettings {
    /// Days a song may sit in an active stage before it is overdue
    pub stage_deadline_days: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            stage_deadline_days: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "songflow".to_string(),
        }
    }
}

/// Returns the path to the songflow home directory (~/.songflow)
pub fn songflow_home() -> Result<PathBuf> {
    if let Some(custom) = std::env::var_os("SONGFLOW_HOME") {
        return Ok(PathBuf::from(custom));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".songflow"))
}

/// Paths to all songflow files
#[derive(Debug, Clone)]
pub struct SongflowPaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub db: PathBuf,
    pub db_file: PathBuf,
}

impl SongflowPaths {
    pub fn new() -> Result<Self> {
        Ok(Self::at(songflow_home()?))
    }

    /// Layout rooted at an explicit directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config: root.join("config.toml"),
            db: root.join("db"),
            db_file: root.join("db/songflow.db"),
            root,
        }
    }

    /// Create all directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create songflow root")?;
        fs::create_dir_all(&self.db).context("Failed to create db directory")?;
        Ok(())
    }

    /// Check if songflow has been initialized
    pub fn is_initialized(&self) -> bool {
        self.config.exists() && self.db_file.exists()
    }
}

/// Load configuration from disk, falling back to defaults when absent
pub fn load_config(paths: &SongflowPaths) -> Result<Config> {
    if !paths.config.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&paths.config).context("Failed to read config.toml")?;
    toml::from_str(&content).context("Failed to parse config.toml")
}

/// Save configuration to disk
pub fn save_config(paths: &SongflowPaths, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&paths.config, content).context("Failed to write config.toml")?;
    Ok(())
}
