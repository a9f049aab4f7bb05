//! Active entry registry.
//!
//! Owns one coordinator, its reading entities and its background loop per
//! configured entry. Every loop stops on its own unload or on the process-wide
//! shutdown signal, whichever comes first.

use regionmetrics_core::config::ConfigEntry;
use regionmetrics_core::error::CoreError;
use regionmetrics_core::ports::fetcher::MetricsFetcher;
use regionmetrics_core::ports::statistics::StatisticsStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::appender::StatisticsRecorder;
use crate::coordinator::RefreshCoordinator;
use crate::sensor::RegionSensors;

/// Running entry
pub struct EntryHandle {
    pub entry: ConfigEntry,
    pub coordinator: Arc<RefreshCoordinator>,
    pub sensors: Arc<RegionSensors>,
    stop_tx: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl EntryHandle {
    /// Whether the background refresh loop is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Entry id → running entry
pub struct EntryRegistry {
    fetcher: Arc<dyn MetricsFetcher>,
    store: Arc<dyn StatisticsStore>,
    interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
    entries: HashMap<String, EntryHandle>,
}

impl EntryRegistry {
    pub fn new(
        fetcher: Arc<dyn MetricsFetcher>,
        store: Arc<dyn StatisticsStore>,
        interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            fetcher,
            store,
            interval,
            shutdown_rx,
            entries: HashMap::new(),
        }
    }

    /// Bring an entry up.
    ///
    /// Listeners are attached before the blocking first refresh so the first
    /// record also populates readings and statistics. When that refresh fails
    /// nothing is registered and the error is returned.
    pub async fn setup_entry(&mut self, entry: ConfigEntry) -> Result<(), CoreError> {
        if self.entries.contains_key(&entry.entry_id) {
            return Err(CoreError::Config(format!(
                "entry already loaded: {}",
                entry.entry_id
            )));
        }

        let coordinator = Arc::new(RefreshCoordinator::new(
            entry.title.clone(),
            entry.region_id.clone(),
            self.fetcher.clone(),
            self.interval,
        ));
        let sensors = Arc::new(RegionSensors::new(
            &entry.entry_id,
            &entry.region_id,
            entry.region_name.as_deref(),
        ));

        coordinator.register_listener(sensors.clone());
        coordinator.register_listener(Arc::new(StatisticsRecorder::new(self.store.clone())));

        coordinator.first_refresh().await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let stop_tx = Arc::new(stop_tx);
        tokio::spawn(forward_shutdown(self.shutdown_rx.clone(), stop_tx.clone()));
        let task = tokio::spawn(coordinator.clone().run(stop_rx));

        info!("entry loaded: {} ({})", entry.title, entry.entry_id);
        self.entries.insert(
            entry.entry_id.clone(),
            EntryHandle {
                entry,
                coordinator,
                sensors,
                stop_tx,
                task,
            },
        );
        Ok(())
    }

    /// Stop an entry's loop and drop it. Returns `false` for an unknown id.
    pub async fn unload_entry(&mut self, entry_id: &str) -> bool {
        let Some(handle) = self.entries.remove(entry_id) else {
            return false;
        };

        let _ = handle.stop_tx.send(true);
        if let Err(e) = handle.task.await {
            warn!("refresh loop for {entry_id} ended abnormally: {e}");
        }
        info!("entry unloaded: {} ({entry_id})", handle.entry.title);
        true
    }

    pub async fn unload_all(&mut self) {
        let ids: Vec<String> = self.entries.keys().cloned().collect();
        for id in ids {
            self.unload_entry(&id).await;
        }
    }

    pub fn get(&self, entry_id: &str) -> Option<&EntryHandle> {
        self.entries.get(entry_id)
    }

    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Relay the shared shutdown flag to one entry's loop.
///
/// Ends when the flag is raised, when the shared sender goes away, or when the
/// entry's loop has exited on its own.
async fn forward_shutdown(
    mut shutdown_rx: watch::Receiver<bool>,
    stop_tx: Arc<watch::Sender<bool>>,
) {
    tokio::select! {
        _ = stop_tx.closed() => {}
        raised = async {
            loop {
                if *shutdown_rx.borrow_and_update() {
                    return true;
                }
                if shutdown_rx.changed().await.is_err() {
                    return false;
                }
            }
        } => {
            if raised {
                let _ = stop_tx.send(true);
            }
        }
    }
}
