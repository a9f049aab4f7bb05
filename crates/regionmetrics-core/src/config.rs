//! Application configuration structs.
//!
//! Upstream endpoint, refresh schedule, statistics DB location and the list of
//! configured region entries. Loaded and saved as JSON by
//! [`ConfigManager`](crate::config_manager::ConfigManager).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Published residential metrics document
pub const DEFAULT_METRICS_URL: &str =
    "https://api.starlink.com/public-files/metrics_residential.json";

/// Top-level application config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream document settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Refresh schedule
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Statistics store settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Configured regions, one coordinator each
    #[serde(default)]
    pub entries: Vec<ConfigEntry>,
}

// ============================================================
// Sections
// ============================================================

/// Upstream document settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Metrics document URL
    #[serde(default = "default_metrics_url")]
    pub url: String,
    /// Hard timeout of one fetch (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_metrics_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Refresh schedule.
///
/// The upstream document is republished weekly, so the default interval is
/// seven days. Failed refreshes retry on the same interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval_secs(),
        }
    }
}

/// Statistics store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite DB file path (None = platform data dir)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// One configured region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Generated at setup, stable for the entry's lifetime
    pub entry_id: String,
    /// Opaque upstream region identifier
    pub region_id: String,
    /// Display-only name
    #[serde(default)]
    pub region_name: Option<String>,
    /// Entry title shown to the operator
    pub title: String,
}

impl ConfigEntry {
    /// Title derived from the region name, falling back to the id.
    pub fn title_for(region_id: &str, region_name: Option<&str>) -> String {
        format!("Starlink Region {}", region_name.unwrap_or(region_id))
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// Default settings
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Fetch timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_secs)
    }

    /// Refresh interval as a Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    /// Entry configured for `region_id`, if any
    pub fn entry_for_region(&self, region_id: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.region_id == region_id)
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.upstream.url.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "upstream.url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.upstream.request_timeout_secs == 0 {
            return Err(CoreError::Validation {
                field: "upstream.request_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.refresh.interval_secs == 0 {
            return Err(CoreError::Validation {
                field: "refresh.interval_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(entry) = self.entries.iter().find(|e| e.region_id.trim().is_empty()) {
            return Err(CoreError::Validation {
                field: "entries.region_id".to_string(),
                message: format!("entry {} has an empty region id", entry.entry_id),
            });
        }
        Ok(())
    }
}

// ============================================================
// Default value functions
// ============================================================

fn default_metrics_url() -> String {
    DEFAULT_METRICS_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_refresh_interval_secs() -> u64 {
    7 * 24 * 60 * 60
}
