//! Long-term statistics recording.
//!
//! [`StatisticsAppender`] writes one point to one series; [`StatisticsRecorder`]
//! is the coordinator listener that calls it for every present reading of a
//! refreshed record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regionmetrics_core::error::CoreError;
use regionmetrics_core::models::catalog::CATALOG;
use regionmetrics_core::models::region::RegionRecord;
use regionmetrics_core::models::statistic::{statistic_id, StatisticMetadata, StatisticPoint};
use regionmetrics_core::ports::listener::UpdateListener;
use regionmetrics_core::ports::statistics::StatisticsStore;
use regionmetrics_core::projection::project;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a successful append call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new point was written
    Recorded,
    /// The series already has a point at or after this timestamp
    Skipped,
}

/// Appends points to long-term series
pub struct StatisticsAppender {
    store: Arc<dyn StatisticsStore>,
}

impl StatisticsAppender {
    pub fn new(store: Arc<dyn StatisticsStore>) -> Self {
        Self { store }
    }

    /// Append one point to the series of `(region_id, metric_key)`.
    ///
    /// Store failures come back as `AppendFailed` tagged with the series id.
    pub async fn append(
        &self,
        region_id: &str,
        metric_key: &str,
        display_name: &str,
        unit: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<AppendOutcome, CoreError> {
        let id = statistic_id(region_id, metric_key);
        let failed = |e: CoreError| CoreError::AppendFailed {
            statistic_id: id.clone(),
            message: e.to_string(),
        };

        if let Some(last) = self.store.last_point(&id).await.map_err(failed)? {
            // stored points keep millisecond resolution
            if last.start.timestamp_millis() >= timestamp.timestamp_millis() {
                debug!(
                    "skipping {id} @ {}: last point is {}",
                    timestamp.to_rfc3339(),
                    last.start.to_rfc3339()
                );
                return Ok(AppendOutcome::Skipped);
            }
        }

        let metadata = StatisticMetadata::measurement(id.clone(), display_name, unit);
        let point = StatisticPoint::new(id.clone(), timestamp, value);

        let inserted = self
            .store
            .add_point(&metadata, &point)
            .await
            .map_err(failed)?;

        if inserted {
            debug!("recorded {id} @ {} = {value}", timestamp.to_rfc3339());
            Ok(AppendOutcome::Recorded)
        } else {
            Ok(AppendOutcome::Skipped)
        }
    }
}

/// Per-cycle tally of [`StatisticsRecorder`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub attempted: usize,
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Coordinator listener recording every present reading of a refreshed record.
pub struct StatisticsRecorder {
    appender: StatisticsAppender,
}

impl StatisticsRecorder {
    pub fn new(store: Arc<dyn StatisticsStore>) -> Self {
        Self {
            appender: StatisticsAppender::new(store),
        }
    }

    /// Record one cycle. Each failure is logged and the loop moves on.
    pub async fn record(&self, record: &RegionRecord) -> RecordSummary {
        let mut summary = RecordSummary::default();

        for (entry, value) in project(record, &CATALOG) {
            let Some(value) = value else {
                continue;
            };
            summary.attempted += 1;

            let outcome = self
                .appender
                .append(
                    &record.region_id,
                    entry.key,
                    entry.name,
                    entry.unit.as_str(),
                    record.fetched_at,
                    value,
                )
                .await;

            match outcome {
                Ok(AppendOutcome::Recorded) => summary.recorded += 1,
                Ok(AppendOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!("{e}");
                }
            }
        }

        summary
    }
}

#[async_trait]
impl UpdateListener for StatisticsRecorder {
    fn name(&self) -> &str {
        "statistics"
    }

    async fn on_update(&self, record: &RegionRecord) -> Result<(), CoreError> {
        let summary = self.record(record).await;
        debug!(
            "[{}] statistics cycle: attempted={} recorded={} skipped={} failed={}",
            record.region_id, summary.attempted, summary.recorded, summary.skipped, summary.failed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record_with, MemoryStore};
    use chrono::{Duration, TimeZone};
    use regionmetrics_storage::sqlite::SqliteStatisticsStore;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn full_record() -> RegionRecord {
        record_with(&[
            ("latency_p20", 20.0),
            ("latency_p50", 30.0),
            ("latency_p80", 45.0),
            ("download_p20", 50.0),
            ("download_p50", 110.0),
            ("download_p80", 200.0),
            ("upload_p20", 5.0),
            ("upload_p50", 12.0),
            ("upload_p80", 20.0),
        ])
    }

    #[tokio::test]
    async fn append_writes_measurement_point() {
        let store = Arc::new(MemoryStore::default());
        let appender = StatisticsAppender::new(store.clone());

        let outcome = appender
            .append("US", "latency_p50", "Latency P50 (Median)", "ms", ts(0), 24.5)
            .await
            .unwrap();
        assert_eq!(outcome, AppendOutcome::Recorded);

        let points = store.points.lock();
        let (meta, point) = &points[0];
        assert_eq!(meta.statistic_id, "starlink_regional_metrics:latency_p50_US");
        assert_eq!(meta.unit, "ms");
        assert!(meta.has_mean && !meta.has_sum);
        assert_eq!(point.mean, 24.5);
        assert_eq!(point.state, 24.5);
    }

    #[tokio::test]
    async fn same_timestamp_is_not_recorded_twice() {
        let store = Arc::new(SqliteStatisticsStore::open_in_memory().unwrap());
        let appender = StatisticsAppender::new(store.clone());

        let first = appender
            .append("US", "upload_p80", "Upload Speed P80", "Mbit/s", ts(0), 14.0)
            .await
            .unwrap();
        let second = appender
            .append("US", "upload_p80", "Upload Speed P80", "Mbit/s", ts(0), 15.0)
            .await
            .unwrap();

        assert_eq!(first, AppendOutcome::Recorded);
        assert_eq!(second, AppendOutcome::Skipped);

        let points = store
            .get_points(&statistic_id("US", "upload_p80"), 10)
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].mean, 14.0);
    }

    #[tokio::test]
    async fn older_timestamp_is_skipped() {
        let store = Arc::new(MemoryStore::default());
        let appender = StatisticsAppender::new(store.clone());

        appender
            .append("US", "latency_p20", "Latency P20", "ms", ts(3600), 20.0)
            .await
            .unwrap();
        let outcome = appender
            .append("US", "latency_p20", "Latency P20", "ms", ts(0), 21.0)
            .await
            .unwrap();

        assert_eq!(outcome, AppendOutcome::Skipped);
        assert_eq!(store.add_calls(), 1);
    }

    #[tokio::test]
    async fn sub_millisecond_repeat_is_skipped_before_store() {
        let store = Arc::new(MemoryStore::default());
        let appender = StatisticsAppender::new(store.clone());
        let timestamp = ts(0) + Duration::nanoseconds(123_456_789);

        let first = appender
            .append("US", "latency_p50", "Latency P50 (Median)", "ms", timestamp, 24.5)
            .await
            .unwrap();
        let second = appender
            .append("US", "latency_p50", "Latency P50 (Median)", "ms", timestamp, 24.5)
            .await
            .unwrap();

        assert_eq!(first, AppendOutcome::Recorded);
        assert_eq!(second, AppendOutcome::Skipped);
        assert_eq!(store.add_calls(), 1);
    }

    #[tokio::test]
    async fn store_failure_maps_to_append_failed() {
        let appender = StatisticsAppender::new(Arc::new(MemoryStore::failing()));

        let err = appender
            .append("US", "latency_p50", "Latency P50 (Median)", "ms", ts(0), 1.0)
            .await
            .unwrap_err();

        match err {
            CoreError::AppendFailed { statistic_id, .. } => {
                assert_eq!(statistic_id, "starlink_regional_metrics:latency_p50_US");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_present_reading_gives_one_append() {
        let store = Arc::new(MemoryStore::default());
        let recorder = StatisticsRecorder::new(store.clone());

        let summary = recorder.record(&record_with(&[("latency_p50", 24.5)])).await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.recorded, 1);
        assert_eq!(store.add_calls(), 1);
        assert_eq!(
            store.points.lock()[0].1.statistic_id,
            "starlink_regional_metrics:latency_p50_US"
        );
    }

    #[tokio::test]
    async fn full_record_gives_nine_appends_per_cycle() {
        let store = Arc::new(MemoryStore::default());
        let recorder = StatisticsRecorder::new(store.clone());

        let mut record = full_record();
        recorder.on_update(&record).await.unwrap();
        record.fetched_at += Duration::days(7);
        recorder.on_update(&record).await.unwrap();

        assert_eq!(store.add_calls(), 18);
        assert_eq!(store.points.lock().len(), 18);
    }

    #[tokio::test]
    async fn failures_do_not_stop_remaining_readings() {
        let store = Arc::new(MemoryStore::failing());
        let recorder = StatisticsRecorder::new(store.clone());

        let summary = recorder.record(&full_record()).await;

        assert_eq!(summary.attempted, 9);
        assert_eq!(summary.failed, 9);
        assert_eq!(store.add_calls(), 9);
    }

    #[tokio::test]
    async fn one_failing_series_does_not_stop_the_others() {
        let store = Arc::new(MemoryStore::failing_series(&statistic_id("US", "download_p50")));
        let recorder = StatisticsRecorder::new(store.clone());

        let summary = recorder.record(&full_record()).await;

        assert_eq!(summary.attempted, 9);
        assert_eq!(summary.recorded, 8);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.add_calls(), 9);
        assert_eq!(store.points.lock().len(), 8);
    }

    #[tokio::test]
    async fn redelivered_record_is_idempotent() {
        let store = Arc::new(SqliteStatisticsStore::open_in_memory().unwrap());
        let recorder = StatisticsRecorder::new(store.clone());
        let record = full_record();

        let first = recorder.record(&record).await;
        let second = recorder.record(&record).await;

        assert_eq!(first.recorded, 9);
        assert_eq!(second.recorded, 0);
        assert_eq!(second.skipped, 9);
        assert_eq!(store.list_series().await.unwrap().len(), 9);
    }
}
