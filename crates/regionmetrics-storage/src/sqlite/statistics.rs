//! Statistics storage (StatisticsStore port implementation).
//!
//! Points are keyed by millisecond timestamp; `UNIQUE(metadata_id, start_ts)`
//! makes a repeated insert a no-op.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regionmetrics_core::error::CoreError;
use regionmetrics_core::models::statistic::{StatisticMetadata, StatisticPoint};
use regionmetrics_core::ports::statistics::StatisticsStore;
use rusqlite::OptionalExtension;
use tracing::debug;

use super::SqliteStatisticsStore;

fn storage_err(context: &str) -> impl Fn(rusqlite::Error) -> CoreError + '_ {
    move |e| CoreError::Storage(format!("{context}: {e}"))
}

fn point_from_row(statistic_id: &str, row: &rusqlite::Row<'_>) -> rusqlite::Result<StatisticPoint> {
    let start_ts: i64 = row.get(0)?;
    let start = DateTime::<Utc>::from_timestamp_millis(start_ts).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(0, start_ts)
    })?;

    Ok(StatisticPoint {
        statistic_id: statistic_id.to_string(),
        start,
        mean: row.get(1)?,
        state: row.get(2)?,
    })
}

#[async_trait]
impl StatisticsStore for SqliteStatisticsStore {
    async fn last_point(&self, statistic_id: &str) -> Result<Option<StatisticPoint>, CoreError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT s.start_ts, s.mean, s.state
             FROM statistics s
             JOIN statistics_meta m ON m.id = s.metadata_id
             WHERE m.statistic_id = ?1
             ORDER BY s.start_ts DESC
             LIMIT 1",
            rusqlite::params![statistic_id],
            |row| point_from_row(statistic_id, row),
        )
        .optional()
        .map_err(storage_err("failed to query last point"))
    }

    async fn add_point(
        &self,
        metadata: &StatisticMetadata,
        point: &StatisticPoint,
    ) -> Result<bool, CoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(storage_err("failed to begin transaction"))?;

        tx.execute(
            "INSERT INTO statistics_meta (statistic_id, source, name, unit, has_mean, has_sum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(statistic_id) DO UPDATE SET
                source = excluded.source,
                name = excluded.name,
                unit = excluded.unit,
                has_mean = excluded.has_mean,
                has_sum = excluded.has_sum",
            rusqlite::params![
                metadata.statistic_id,
                metadata.source,
                metadata.name,
                metadata.unit,
                metadata.has_mean,
                metadata.has_sum,
            ],
        )
        .map_err(storage_err("failed to upsert series metadata"))?;

        let metadata_id: i64 = tx
            .query_row(
                "SELECT id FROM statistics_meta WHERE statistic_id = ?1",
                rusqlite::params![metadata.statistic_id],
                |row| row.get(0),
            )
            .map_err(storage_err("failed to resolve series id"))?;

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO statistics (metadata_id, start_ts, start, mean, state)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    metadata_id,
                    point.start.timestamp_millis(),
                    point.start.to_rfc3339(),
                    point.mean,
                    point.state,
                ],
            )
            .map_err(storage_err("failed to insert point"))?;

        tx.commit().map_err(storage_err("failed to commit point"))?;

        if inserted == 0 {
            debug!(
                "point already recorded: {} @ {}",
                point.statistic_id,
                point.start.to_rfc3339()
            );
        }
        Ok(inserted > 0)
    }

    async fn get_points(
        &self,
        statistic_id: &str,
        limit: usize,
    ) -> Result<Vec<StatisticPoint>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT s.start_ts, s.mean, s.state
                 FROM statistics s
                 JOIN statistics_meta m ON m.id = s.metadata_id
                 WHERE m.statistic_id = ?1
                 ORDER BY s.start_ts DESC
                 LIMIT ?2",
            )
            .map_err(storage_err("failed to prepare query"))?;

        let points = stmt
            .query_map(rusqlite::params![statistic_id, limit as i64], |row| {
                point_from_row(statistic_id, row)
            })
            .map_err(storage_err("failed to run query"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err("failed to read point"))?;

        Ok(points)
    }

    async fn list_series(&self) -> Result<Vec<StatisticMetadata>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT statistic_id, source, name, unit, has_mean, has_sum
                 FROM statistics_meta
                 ORDER BY statistic_id",
            )
            .map_err(storage_err("failed to prepare query"))?;

        let series = stmt
            .query_map([], |row| {
                Ok(StatisticMetadata {
                    statistic_id: row.get(0)?,
                    source: row.get(1)?,
                    name: row.get(2)?,
                    unit: row.get(3)?,
                    has_mean: row.get(4)?,
                    has_sum: row.get(5)?,
                })
            })
            .map_err(storage_err("failed to run query"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err("failed to read series"))?;

        Ok(series)
    }
}
