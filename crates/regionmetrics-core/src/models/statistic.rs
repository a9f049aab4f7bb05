//! Long-term statistics models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source tag stamped on every series this application writes.
pub const STATISTIC_SOURCE: &str = "starlink_regional_metrics";

/// Stable series identifier for one metric of one region.
pub fn statistic_id(region_id: &str, metric_key: &str) -> String {
    format!("{STATISTIC_SOURCE}:{metric_key}_{region_id}")
}

/// Series metadata, upserted alongside each point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticMetadata {
    pub statistic_id: String,
    pub source: String,
    /// Display name
    pub name: String,
    /// Unit of measurement
    pub unit: String,
    pub has_mean: bool,
    pub has_sum: bool,
}

impl StatisticMetadata {
    /// Metadata for a mean-only measurement series.
    pub fn measurement(statistic_id: String, name: &str, unit: &str) -> Self {
        Self {
            statistic_id,
            source: STATISTIC_SOURCE.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            has_mean: true,
            has_sum: false,
        }
    }
}

/// One recorded point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    pub statistic_id: String,
    pub start: DateTime<Utc>,
    pub mean: f64,
    pub state: f64,
}

impl StatisticPoint {
    pub fn new(statistic_id: String, start: DateTime<Utc>, value: f64) -> Self {
        Self {
            statistic_id,
            start,
            mean: value,
            state: value,
        }
    }
}
