//! SQLite storage adapter.
//!
//! `StatisticsStore` port implementation.
//!
//! # Modules
//! - `statistics`: series metadata and points (StatisticsStore port)

mod statistics;

use regionmetrics_core::error::CoreError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::migration;

/// SQLite statistics store: `StatisticsStore` port implementation
pub struct SqliteStatisticsStore {
    pub(super) conn: Mutex<Connection>,
}

impl SqliteStatisticsStore {
    /// Open (or create) a file-backed store
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("failed to open SQLite: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("failed to set PRAGMAs: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("migration failed: {e}")))?;

        info!("SQLite statistics store ready: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (tests, one-shot commands)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("failed to open in-memory SQLite: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| CoreError::Storage(format!("failed to set PRAGMAs: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("migration failed: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(super) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Storage(format!("failed to acquire lock: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use regionmetrics_core::models::statistic::{statistic_id, StatisticMetadata, StatisticPoint};
    use regionmetrics_core::ports::statistics::StatisticsStore;
    use std::sync::Arc;

    fn meta(region: &str, key: &str) -> StatisticMetadata {
        StatisticMetadata::measurement(statistic_id(region, key), "Latency P50 (Median)", "ms")
    }

    fn point(region: &str, key: &str, secs: i64, value: f64) -> StatisticPoint {
        StatisticPoint::new(
            statistic_id(region, key),
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            value,
        )
    }

    #[tokio::test]
    async fn add_and_read_last_point() {
        let store = SqliteStatisticsStore::open_in_memory().unwrap();
        let m = meta("US", "latency_p50");

        assert!(store.last_point(&m.statistic_id).await.unwrap().is_none());

        assert!(store.add_point(&m, &point("US", "latency_p50", 0, 24.5)).await.unwrap());
        assert!(store.add_point(&m, &point("US", "latency_p50", 60, 25.0)).await.unwrap());

        let last = store.last_point(&m.statistic_id).await.unwrap().unwrap();
        assert_eq!(last.mean, 25.0);
        assert_eq!(last.state, 25.0);
        assert_eq!(last.start, Utc.timestamp_opt(1_700_000_060, 0).unwrap());
    }

    #[tokio::test]
    async fn duplicate_timestamp_is_ignored() {
        let store = SqliteStatisticsStore::open_in_memory().unwrap();
        let m = meta("US", "latency_p50");
        let p = point("US", "latency_p50", 0, 24.5);

        assert!(store.add_point(&m, &p).await.unwrap());
        assert!(!store.add_point(&m, &p).await.unwrap());

        let points = store.get_points(&m.statistic_id, 10).await.unwrap();
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn series_are_isolated() {
        let store = SqliteStatisticsStore::open_in_memory().unwrap();
        let us = meta("US", "latency_p50");
        let ca = meta("CA", "latency_p50");

        store.add_point(&us, &point("US", "latency_p50", 0, 20.0)).await.unwrap();
        store.add_point(&ca, &point("CA", "latency_p50", 0, 30.0)).await.unwrap();

        let last_ca = store.last_point(&ca.statistic_id).await.unwrap().unwrap();
        assert_eq!(last_ca.mean, 30.0);
        assert_eq!(store.list_series().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_points_newest_first_with_limit() {
        let store = SqliteStatisticsStore::open_in_memory().unwrap();
        let m = meta("US", "latency_p50");
        for i in 0..5 {
            store
                .add_point(&m, &point("US", "latency_p50", i * 3600, i as f64))
                .await
                .unwrap();
        }

        let points = store.get_points(&m.statistic_id, 3).await.unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.mean).collect();
        assert_eq!(values, vec![4.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn metadata_is_upserted() {
        let store = SqliteStatisticsStore::open_in_memory().unwrap();
        let mut m = meta("US", "latency_p50");
        store.add_point(&m, &point("US", "latency_p50", 0, 1.0)).await.unwrap();

        m.name = "Latency P50".to_string();
        store.add_point(&m, &point("US", "latency_p50", 1, 2.0)).await.unwrap();

        let series = store.list_series().await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Latency P50");
        assert!(series[0].has_mean);
        assert!(!series[0].has_sum);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.db");
        let m = meta("US", "upload_p80");

        {
            let store = SqliteStatisticsStore::open(&path).unwrap();
            store.add_point(&m, &point("US", "upload_p80", 0, 14.0)).await.unwrap();
        }

        let store = SqliteStatisticsStore::open(&path).unwrap();
        let last = store.last_point(&m.statistic_id).await.unwrap().unwrap();
        assert_eq!(last.mean, 14.0);
    }

    #[tokio::test]
    async fn concurrent_appends_to_distinct_timestamps() {
        let store = Arc::new(SqliteStatisticsStore::open_in_memory().unwrap());
        let m = meta("US", "download_p50");
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let s = store.clone();
                let m = m.clone();
                tokio::spawn(async move {
                    let p = StatisticPoint::new(
                        m.statistic_id.clone(),
                        start + Duration::minutes(i),
                        i as f64,
                    );
                    s.add_point(&m, &p).await.unwrap()
                })
            })
            .collect();

        for h in handles {
            assert!(h.await.unwrap());
        }

        let points = store.get_points(&m.statistic_id, 100).await.unwrap();
        assert_eq!(points.len(), 10);
    }
}
