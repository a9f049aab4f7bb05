//! Test doubles shared by the coordinator unit tests.

use async_trait::async_trait;
use chrono::SubsecRound;
use parking_lot::Mutex;
use regionmetrics_core::error::CoreError;
use regionmetrics_core::models::region::RegionRecord;
use regionmetrics_core::models::statistic::{StatisticMetadata, StatisticPoint};
use regionmetrics_core::ports::fetcher::MetricsFetcher;
use regionmetrics_core::ports::listener::UpdateListener;
use regionmetrics_core::ports::statistics::StatisticsStore;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub fn record_with(metrics: &[(&str, f64)]) -> RegionRecord {
    let metrics: BTreeMap<String, f64> = metrics
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    RegionRecord::new("US", metrics)
}

/// Fetcher replaying a fixed script of results. Errors once the script runs out.
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<RegionRecord, CoreError>>>,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
    started: Notify,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<RegionRecord, CoreError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            gate: None,
            started: Notify::new(),
        }
    }

    /// Every fetch blocks until `release` is called.
    pub fn gated(responses: Vec<Result<RegionRecord, CoreError>>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(responses)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl MetricsFetcher for ScriptedFetcher {
    async fn fetch(&self, region_id: &str) -> Result<RegionRecord, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| CoreError::Internal(e.to_string()))?;
            permit.forget();
        }

        let next = self.responses.lock().pop_front();
        match next {
            Some(Ok(mut record)) => {
                record.region_id = region_id.to_string();
                Ok(record)
            }
            Some(Err(e)) => Err(e),
            None => Err(CoreError::FetchFailed("script exhausted".to_string())),
        }
    }
}

enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Listener appending its name to a shared log on every update.
pub struct RecordingListener {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    updates: AtomicUsize,
    behavior: Behavior,
}

impl RecordingListener {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log,
            updates: AtomicUsize::new(0),
            behavior: Behavior::Succeed,
        }
    }

    pub fn failing(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            behavior: Behavior::Fail,
            ..Self::new(name, log)
        }
    }

    pub fn panicking(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            behavior: Behavior::Panic,
            ..Self::new(name, log)
        }
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpdateListener for RecordingListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_update(&self, _record: &RegionRecord) -> Result<(), CoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(self.name.clone());
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(CoreError::Internal("listener failure".to_string())),
            Behavior::Panic => panic!("listener panic"),
        }
    }
}

/// In-memory store keeping millisecond timestamps like the SQLite store.
///
/// Can be told to fail every write or the writes of one series.
#[derive(Default)]
pub struct MemoryStore {
    pub points: Mutex<Vec<(StatisticMetadata, StatisticPoint)>>,
    pub fail_writes: bool,
    pub fail_series: Option<String>,
    pub add_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn failing_series(statistic_id: &str) -> Self {
        Self {
            fail_series: Some(statistic_id.to_string()),
            ..Self::default()
        }
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn last_point(&self, statistic_id: &str) -> Result<Option<StatisticPoint>, CoreError> {
        Ok(self
            .points
            .lock()
            .iter()
            .filter(|(_, p)| p.statistic_id == statistic_id)
            .map(|(_, p)| p.clone())
            .max_by_key(|p| p.start))
    }

    async fn add_point(
        &self,
        metadata: &StatisticMetadata,
        point: &StatisticPoint,
    ) -> Result<bool, CoreError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes || self.fail_series.as_deref() == Some(point.statistic_id.as_str()) {
            return Err(CoreError::Storage("disk full".to_string()));
        }
        let mut stored = point.clone();
        stored.start = point.start.trunc_subsecs(3);

        let mut points = self.points.lock();
        if points
            .iter()
            .any(|(_, p)| p.statistic_id == stored.statistic_id && p.start == stored.start)
        {
            return Ok(false);
        }
        points.push((metadata.clone(), stored));
        Ok(true)
    }

    async fn get_points(
        &self,
        statistic_id: &str,
        limit: usize,
    ) -> Result<Vec<StatisticPoint>, CoreError> {
        let mut points: Vec<StatisticPoint> = self
            .points
            .lock()
            .iter()
            .filter(|(_, p)| p.statistic_id == statistic_id)
            .map(|(_, p)| p.clone())
            .collect();
        points.sort_by(|a, b| b.start.cmp(&a.start));
        points.truncate(limit);
        Ok(points)
    }

    async fn list_series(&self) -> Result<Vec<StatisticMetadata>, CoreError> {
        let mut series: Vec<StatisticMetadata> =
            self.points.lock().iter().map(|(m, _)| m.clone()).collect();
        series.sort_by(|a, b| a.statistic_id.cmp(&b.statistic_id));
        series.dedup_by(|a, b| a.statistic_id == b.statistic_id);
        Ok(series)
    }
}
