//! Upstream metrics document and the per-region record extracted from it.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::CoreError;

/// Published metrics document.
///
/// Both mappings are keyed by region identifier. Either may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsDocument {
    /// Country-level metrics
    #[serde(rename = "admin0Metrics", default)]
    pub admin0_metrics: HashMap<String, serde_json::Value>,
    /// Subdivision-level metrics
    #[serde(rename = "admin1Metrics", default)]
    pub admin1_metrics: HashMap<String, serde_json::Value>,
}

impl MetricsDocument {
    /// Parse a document from a JSON body.
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body)
            .map_err(|e| CoreError::FetchFailed(format!("malformed metrics document: {e}")))
    }

    /// Extract one region's record.
    ///
    /// `admin0Metrics` is checked before `admin1Metrics`; the first mapping that
    /// contains `region_id` wins even if the other one also has it.
    pub fn region_record(&self, region_id: &str) -> Result<RegionRecord, CoreError> {
        let raw = self
            .admin0_metrics
            .get(region_id)
            .or_else(|| self.admin1_metrics.get(region_id))
            .ok_or_else(|| CoreError::RegionNotFound {
                region_id: region_id.to_string(),
            })?;

        RegionRecord::from_value(region_id, raw)
    }

    /// Whether the region exists in either mapping.
    pub fn contains_region(&self, region_id: &str) -> bool {
        self.admin0_metrics.contains_key(region_id) || self.admin1_metrics.contains_key(region_id)
    }
}

/// Percentile metrics for one region at one successful fetch.
///
/// Non-numeric and `null` values from the upstream document are dropped, so a
/// key missing from `metrics` means the reading is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Region identifier from the entry configuration
    pub region_id: String,
    /// metric key → value
    pub metrics: BTreeMap<String, f64>,
    /// When the record was fetched, at millisecond precision
    pub fetched_at: DateTime<Utc>,
}

impl RegionRecord {
    /// Create a record stamped with the current time.
    ///
    /// The stamp is truncated to milliseconds, the resolution statistics are
    /// stored at.
    pub fn new(region_id: impl Into<String>, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            region_id: region_id.into(),
            metrics,
            fetched_at: Utc::now().trunc_subsecs(3),
        }
    }

    fn from_value(region_id: &str, raw: &serde_json::Value) -> Result<Self, CoreError> {
        if raw.is_null() {
            return Err(CoreError::RegionNotFound {
                region_id: region_id.to_string(),
            });
        }

        let object = raw.as_object().ok_or_else(|| {
            CoreError::FetchFailed(format!("metrics for region {region_id} are not an object"))
        })?;

        let metrics = object
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
            .collect();

        Ok(Self::new(region_id, metrics))
    }

    /// Value for one metric key, if present.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }
}
