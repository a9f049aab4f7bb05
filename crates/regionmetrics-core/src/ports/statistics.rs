//! Long-term statistics store port.
//!
//! Implementation: `regionmetrics-storage` (rusqlite)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::statistic::{StatisticMetadata, StatisticPoint};

/// Append-only series store keyed by statistic id.
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Most recent point of a series, if any.
    async fn last_point(&self, statistic_id: &str) -> Result<Option<StatisticPoint>, CoreError>;

    /// Upsert series metadata and insert one point.
    ///
    /// Returns `false` when a point with the same series and timestamp already
    /// exists; nothing is written in that case.
    async fn add_point(
        &self,
        metadata: &StatisticMetadata,
        point: &StatisticPoint,
    ) -> Result<bool, CoreError>;

    /// Latest points of a series, newest first.
    async fn get_points(
        &self,
        statistic_id: &str,
        limit: usize,
    ) -> Result<Vec<StatisticPoint>, CoreError>;

    /// Metadata of every known series.
    async fn list_series(&self) -> Result<Vec<StatisticMetadata>, CoreError>;
}
