//! Reading entities for one configured entry.
//!
//! Projects each refreshed record onto the catalog and keeps the resulting
//! readings for presentation layers.

use async_trait::async_trait;
use parking_lot::RwLock;
use regionmetrics_core::error::CoreError;
use regionmetrics_core::models::catalog::{MetricCatalogEntry, CATALOG};
use regionmetrics_core::models::reading::{DeviceInfo, Reading};
use regionmetrics_core::models::region::RegionRecord;
use regionmetrics_core::ports::listener::UpdateListener;
use regionmetrics_core::projection::project;
use tracing::debug;

/// The nine readings of one entry, updated on every successful refresh.
pub struct RegionSensors {
    entry_id: String,
    device: DeviceInfo,
    readings: RwLock<Vec<Reading>>,
}

impl RegionSensors {
    pub fn new(entry_id: &str, region_id: &str, region_name: Option<&str>) -> Self {
        let readings = CATALOG
            .iter()
            .map(|entry| empty_reading(entry_id, entry))
            .collect();

        Self {
            entry_id: entry_id.to_string(),
            device: DeviceInfo::for_entry(entry_id, region_id, region_name),
            readings: RwLock::new(readings),
        }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Snapshot of every reading in catalog order.
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.read().clone()
    }

    pub fn reading(&self, key: &str) -> Option<Reading> {
        self.readings.read().iter().find(|r| r.key == key).cloned()
    }

    /// Apply a record. Keys missing from the record become unavailable.
    pub fn apply(&self, record: &RegionRecord) {
        let updated: Vec<Reading> = project(record, &CATALOG)
            .into_iter()
            .map(|(entry, value)| Reading {
                value,
                last_updated: Some(record.fetched_at),
                ..empty_reading(&self.entry_id, entry)
            })
            .collect();

        let available = updated.iter().filter(|r| r.available()).count();
        *self.readings.write() = updated;
        debug!(
            "[{}] readings updated: {available}/{} available",
            self.entry_id,
            CATALOG.len()
        );
    }
}

fn empty_reading(entry_id: &str, entry: &MetricCatalogEntry) -> Reading {
    Reading {
        unique_id: format!("{entry_id}_{}", entry.key),
        key: entry.key,
        name: entry.name,
        unit: entry.unit,
        category: entry.category,
        icon: entry.icon,
        value: None,
        last_updated: None,
    }
}

#[async_trait]
impl UpdateListener for RegionSensors {
    fn name(&self) -> &str {
        "sensors"
    }

    async fn on_update(&self, record: &RegionRecord) -> Result<(), CoreError> {
        self.apply(record);
        Ok(())
    }
}
