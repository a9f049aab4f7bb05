//! Fixed metric catalog.
//!
//! Nine percentile readings published for every region: latency, download and
//! upload at p20/p50/p80.

use serde::{Deserialize, Serialize};

/// Unit of a reading. Values are passed through unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Milliseconds
    #[serde(rename = "ms")]
    Milliseconds,
    /// Megabits per second
    #[serde(rename = "Mbit/s")]
    MegabitsPerSecond,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Milliseconds => "ms",
            Unit::MegabitsPerSecond => "Mbit/s",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reading category (device class for presentation layers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Duration,
    DataRate,
}

/// Static descriptor of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricCatalogEntry {
    /// Key in the upstream region mapping
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    pub unit: Unit,
    pub category: Category,
    /// Icon hint for presentation layers
    pub icon: &'static str,
}

/// The full catalog, in presentation order.
pub const CATALOG: [MetricCatalogEntry; 9] = [
    MetricCatalogEntry {
        key: "latency_p20",
        name: "Latency P20",
        unit: Unit::Milliseconds,
        category: Category::Duration,
        icon: "mdi:timer-outline",
    },
    MetricCatalogEntry {
        key: "latency_p50",
        name: "Latency P50 (Median)",
        unit: Unit::Milliseconds,
        category: Category::Duration,
        icon: "mdi:timer",
    },
    MetricCatalogEntry {
        key: "latency_p80",
        name: "Latency P80",
        unit: Unit::Milliseconds,
        category: Category::Duration,
        icon: "mdi:timer",
    },
    MetricCatalogEntry {
        key: "download_p20",
        name: "Download Speed P20",
        unit: Unit::MegabitsPerSecond,
        category: Category::DataRate,
        icon: "mdi:download",
    },
    MetricCatalogEntry {
        key: "download_p50",
        name: "Download Speed P50 (Median)",
        unit: Unit::MegabitsPerSecond,
        category: Category::DataRate,
        icon: "mdi:download",
    },
    MetricCatalogEntry {
        key: "download_p80",
        name: "Download Speed P80",
        unit: Unit::MegabitsPerSecond,
        category: Category::DataRate,
        icon: "mdi:download",
    },
    MetricCatalogEntry {
        key: "upload_p20",
        name: "Upload Speed P20",
        unit: Unit::MegabitsPerSecond,
        category: Category::DataRate,
        icon: "mdi:upload",
    },
    MetricCatalogEntry {
        key: "upload_p50",
        name: "Upload Speed P50 (Median)",
        unit: Unit::MegabitsPerSecond,
        category: Category::DataRate,
        icon: "mdi:upload",
    },
    MetricCatalogEntry {
        key: "upload_p80",
        name: "Upload Speed P80",
        unit: Unit::MegabitsPerSecond,
        category: Category::DataRate,
        icon: "mdi:upload",
    },
];

/// Look up a catalog entry by key.
pub fn find(key: &str) -> Option<&'static MetricCatalogEntry> {
    CATALOG.iter().find(|entry| entry.key == key)
}
