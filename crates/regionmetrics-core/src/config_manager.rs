//! Config file management.
//!
//! Stores the config as JSON in the platform config directory.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Statistics DB file name
const DB_FILE_NAME: &str = "statistics.db";

/// Config manager
///
/// Loads/saves the config file and holds the in-memory copy.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Current config
    config: Arc<RwLock<AppConfig>>,
    /// Config file path
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager for the platform default path.
    ///
    /// Writes a default config file when none exists.
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        Self::with_path(config_path)
    }

    /// Create a manager for an explicit path.
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "failed to create config dir {}: {e}",
                        parent.display()
                    ))
                })?;
                info!("created config dir: {}", parent.display());
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default_config();
            Self::save_to_file(&config_path, &default_config)?;
            info!("wrote default config: {}", config_path.display());
            default_config
        };

        config.validate()?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Current config (cloned)
    pub fn get(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Replace the config and persist it.
    pub fn update(&self, new_config: AppConfig) -> Result<(), CoreError> {
        new_config.validate()?;
        Self::save_to_file(&self.config_path, &new_config)?;
        *self.config.write() = new_config;
        debug!("config saved: {}", self.config_path.display());
        Ok(())
    }

    /// Apply `updater` to a copy of the config and persist the result.
    pub fn update_with<F>(&self, updater: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// Config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the config file.
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = Self::load_from_file(&self.config_path)?;
        config.validate()?;
        *self.config.write() = config;
        info!("config reloaded");
        Ok(())
    }

    /// Statistics DB path: explicit `storage.db_path` or the platform data dir.
    pub fn db_path(&self) -> Result<PathBuf, CoreError> {
        match self.config.read().storage.db_path.clone() {
            Some(path) => Ok(path),
            None => Ok(Self::data_dir()?.join(DB_FILE_NAME)),
        }
    }

    /// Platform config dir
    ///
    /// - Linux: `~/.config/regionmetrics/`
    /// - macOS: `~/Library/Application Support/io.regionmetrics.regionmetrics/`
    /// - Windows: `%APPDATA%\regionmetrics\regionmetrics\config\`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Platform data dir (statistics DB)
    pub fn data_dir() -> Result<PathBuf, CoreError> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs, CoreError> {
        ProjectDirs::from("io", "regionmetrics", "regionmetrics")
            .ok_or_else(|| CoreError::Config("no home directory for config".to_string()))
    }

    fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("failed to parse config {}: {e}", path.display()))
        })?;

        debug!("config loaded: {}", path.display());
        Ok(config)
    }

    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CoreError::Config(format!("failed to serialize config: {e}")))?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("failed to write config {}: {e}", path.display()))
        })?;

        Ok(())
    }
}
