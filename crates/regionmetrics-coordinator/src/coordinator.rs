//! Refresh coordinator.
//!
//! Owns the last-known-good region record, drives the fixed-interval refresh
//! loop and fans successful refreshes out to registered listeners.
//!
//! State machine: `Uninitialized → Ready ⇄ Stale`. A failed refresh keeps the
//! previous record visible and records the error; the next attempt happens on
//! the normal interval.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::RwLock;
use regionmetrics_core::error::CoreError;
use regionmetrics_core::models::region::RegionRecord;
use regionmetrics_core::ports::fetcher::MetricsFetcher;
use regionmetrics_core::ports::listener::UpdateListener;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Coordinator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No refresh has succeeded yet
    Uninitialized,
    /// The latest refresh succeeded
    Ready,
    /// The latest refresh failed; the previous record is still served
    Stale,
}

/// Diagnostic snapshot of the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

/// Result of one refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache replaced and listeners notified
    Updated {
        /// Listeners that returned an error or panicked
        listener_failures: usize,
    },
    /// Fetch failed; cache untouched
    Failed { error: String, retryable: bool },
    /// Another refresh was already in flight
    Coalesced,
}

#[derive(Debug, Default)]
struct CachedState {
    record: Option<Arc<RegionRecord>>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
    consecutive_failures: u32,
}

/// Clears the in-flight flag when the refresh finishes, however it finishes.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Refresh coordinator for one configured region
pub struct RefreshCoordinator {
    /// Name used in logs (entry title)
    name: String,
    region_id: String,
    fetcher: Arc<dyn MetricsFetcher>,
    interval: Duration,
    cache: RwLock<CachedState>,
    listeners: RwLock<Vec<Arc<dyn UpdateListener>>>,
    in_flight: AtomicBool,
}

impl RefreshCoordinator {
    pub fn new(
        name: impl Into<String>,
        region_id: impl Into<String>,
        fetcher: Arc<dyn MetricsFetcher>,
        interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            region_id: region_id.into(),
            fetcher,
            interval,
            cache: RwLock::new(CachedState::default()),
            listeners: RwLock::new(Vec::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Append a listener. Listeners are notified in registration order.
    pub fn register_listener(&self, listener: Arc<dyn UpdateListener>) {
        debug!("[{}] listener registered: {}", self.name, listener.name());
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Last successfully fetched record.
    pub fn current(&self) -> Option<Arc<RegionRecord>> {
        self.cache.read().record.clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        let cache = self.cache.read();
        let state = match (&cache.record, &cache.last_error) {
            (None, _) => CoordinatorState::Uninitialized,
            (Some(_), None) => CoordinatorState::Ready,
            (Some(_), Some(_)) => CoordinatorState::Stale,
        };
        CoordinatorStatus {
            state,
            last_success: cache.last_success,
            last_error: cache.last_error.clone(),
            consecutive_failures: cache.consecutive_failures,
        }
    }

    /// Blocking first fetch.
    ///
    /// The entry only comes up when this succeeds; the error is returned to the
    /// caller instead of being absorbed into stale state.
    pub async fn first_refresh(&self) -> Result<Arc<RegionRecord>, CoreError> {
        let _guard = self.try_begin().ok_or_else(|| {
            CoreError::Internal(format!("[{}] refresh already in flight", self.name))
        })?;

        match self.fetcher.fetch(&self.region_id).await {
            Ok(record) => {
                let record = self.store_success(record);
                info!("[{}] first refresh succeeded", self.name);
                self.notify(&record).await;
                Ok(record)
            }
            Err(e) => {
                self.store_failure(&e);
                error!("[{}] first refresh failed: {e}", self.name);
                Err(e)
            }
        }
    }

    /// One refresh attempt.
    ///
    /// Coalesces with an in-flight attempt instead of queueing behind it.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(_guard) = self.try_begin() else {
            debug!("[{}] refresh already in flight, coalescing", self.name);
            return RefreshOutcome::Coalesced;
        };

        match self.fetcher.fetch(&self.region_id).await {
            Ok(record) => {
                let record = self.store_success(record);
                debug!(
                    "[{}] refresh succeeded: {} metric(s)",
                    self.name,
                    record.metrics.len()
                );
                let listener_failures = self.notify(&record).await;
                RefreshOutcome::Updated { listener_failures }
            }
            Err(e) => {
                let failures = self.store_failure(&e);
                let retryable = e.is_retryable();
                if retryable {
                    warn!(
                        "[{}] refresh failed ({failures} in a row), serving cached data: {e}",
                        self.name
                    );
                } else {
                    error!(
                        "[{}] refresh hit an unexpected error, serving cached data: {e}",
                        self.name
                    );
                }
                RefreshOutcome::Failed {
                    error: e.to_string(),
                    retryable,
                }
            }
        }
    }

    /// Manual refresh request from the host.
    pub async fn request_refresh(&self) -> RefreshOutcome {
        info!("[{}] manual refresh requested", self.name);
        self.refresh().await
    }

    /// Background loop: one refresh per interval until shutdown.
    ///
    /// The first tick fires one interval after start since `first_refresh`
    /// has just populated the cache. Shutdown is only observed between
    /// refreshes, so an in-flight fetch runs to completion or timeout.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "[{}] refresh loop started: interval={}s",
            self.name,
            self.interval.as_secs()
        );

        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("[{}] refresh loop stopped", self.name);
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    fn store_success(&self, record: RegionRecord) -> Arc<RegionRecord> {
        let record = Arc::new(record);
        let mut cache = self.cache.write();
        cache.last_success = Some(record.fetched_at);
        cache.record = Some(record.clone());
        cache.last_error = None;
        cache.consecutive_failures = 0;
        record
    }

    fn store_failure(&self, error: &CoreError) -> u32 {
        let mut cache = self.cache.write();
        cache.last_error = Some(error.to_string());
        cache.consecutive_failures = cache.consecutive_failures.saturating_add(1);
        cache.consecutive_failures
    }

    /// Deliver `record` to every listener in order. Returns the failure count.
    async fn notify(&self, record: &RegionRecord) -> usize {
        let listeners: Vec<Arc<dyn UpdateListener>> = self.listeners.read().clone();
        let mut failures = 0;

        for listener in listeners {
            let delivery = AssertUnwindSafe(listener.on_update(record)).catch_unwind();
            match delivery.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!("[{}] listener {} failed: {e}", self.name, listener.name());
                }
                Err(_) => {
                    failures += 1;
                    error!("[{}] listener {} panicked", self.name, listener.name());
                }
            }
        }

        failures
    }
}
