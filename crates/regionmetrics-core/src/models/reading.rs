//! Observable reading exposed to presentation layers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::{Category, Unit};

/// Current state of one reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Unique id: `{entry_id}_{metric_key}`
    pub unique_id: String,
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Unit,
    pub category: Category,
    pub icon: &'static str,
    /// Last projected value (`None` when the record lacked the key)
    pub value: Option<f64>,
    /// Time of the refresh that produced `value`
    pub last_updated: Option<DateTime<Utc>>,
}

impl Reading {
    /// A reading is available when the latest record carried a value for it.
    pub fn available(&self) -> bool {
        self.value.is_some()
    }
}

/// Device grouping metadata shared by the readings of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Identifier: the entry id
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceInfo {
    pub fn for_entry(entry_id: &str, region_id: &str, region_name: Option<&str>) -> Self {
        Self {
            identifier: entry_id.to_string(),
            name: format!("Starlink Region {}", region_name.unwrap_or(region_id)),
            manufacturer: "Starlink",
            model: "Regional Metrics",
        }
    }
}
