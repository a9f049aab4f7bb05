//! Record → reading projection.

use crate::models::catalog::MetricCatalogEntry;
use crate::models::region::RegionRecord;

/// Map a record onto the catalog.
///
/// One slot per catalog entry, in catalog order. A key missing from the record
/// yields `None`.
pub fn project<'a>(
    record: &RegionRecord,
    catalog: &'a [MetricCatalogEntry],
) -> Vec<(&'a MetricCatalogEntry, Option<f64>)> {
    catalog
        .iter()
        .map(|entry| (entry, record.get(entry.key)))
        .collect()
}
