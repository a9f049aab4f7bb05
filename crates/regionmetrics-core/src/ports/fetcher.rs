//! Upstream metrics fetcher port.
//!
//! Implementation: `regionmetrics-network` (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::region::RegionRecord;

/// Retrieves the record for one region from the published metrics document.
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    /// Perform exactly one bounded request and extract `region_id`.
    ///
    /// Fails with `RegionNotFound` when the region is in neither mapping and
    /// with `FetchFailed` for everything else.
    async fn fetch(&self, region_id: &str) -> Result<RegionRecord, CoreError>;
}
