//! Operator setup flow.
//!
//! Validates a region against the live document before an entry is created.

use regionmetrics_core::config::ConfigEntry;
use regionmetrics_core::error::CoreError;
use regionmetrics_core::ports::fetcher::MetricsFetcher;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Setup form input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupInput {
    pub region_id: String,
    pub region_name: Option<String>,
}

/// Setup rejection shown to the operator
#[derive(Debug, Error)]
pub enum SetupError {
    /// Upstream unreachable or unusable
    #[error("cannot connect to the metrics service: {0}")]
    CannotConnect(String),

    /// Region not present in the document
    #[error("region {region_id} not found in the metrics document")]
    InvalidRegion { region_id: String },

    /// An entry for this region already exists
    #[error("region {region_id} is already configured")]
    AlreadyConfigured { region_id: String },

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl SetupError {
    /// Stable key for the operator-facing message.
    pub fn code(&self) -> &'static str {
        match self {
            SetupError::CannotConnect(_) => "cannot_connect",
            SetupError::InvalidRegion { .. } => "invalid_region",
            SetupError::AlreadyConfigured { .. } => "already_configured",
            SetupError::Unknown(_) => "unknown",
        }
    }
}

impl From<CoreError> for SetupError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::FetchFailed(msg) => SetupError::CannotConnect(msg),
            CoreError::RegionNotFound { region_id } => SetupError::InvalidRegion { region_id },
            other => SetupError::Unknown(other.to_string()),
        }
    }
}

/// Setup flow backed by the live fetcher
pub struct SetupFlow {
    fetcher: Arc<dyn MetricsFetcher>,
}

impl SetupFlow {
    pub fn new(fetcher: Arc<dyn MetricsFetcher>) -> Self {
        Self { fetcher }
    }

    /// Validate `input` and build the entry to persist.
    ///
    /// Duplicates are rejected before any network call.
    pub async fn submit(
        &self,
        existing: &[ConfigEntry],
        input: SetupInput,
    ) -> Result<ConfigEntry, SetupError> {
        let region_id = input.region_id.trim().to_string();
        if region_id.is_empty() {
            return Err(SetupError::InvalidRegion { region_id });
        }

        if existing.iter().any(|e| e.region_id == region_id) {
            return Err(SetupError::AlreadyConfigured { region_id });
        }

        let region_name = input
            .region_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if let Err(e) = self.fetcher.fetch(&region_id).await {
            let err = SetupError::from(e);
            warn!("setup rejected for {region_id}: {} ({err})", err.code());
            return Err(err);
        }

        let entry = ConfigEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            title: ConfigEntry::title_for(&region_id, region_name.as_deref()),
            region_id,
            region_name,
        };
        info!("setup accepted: {} ({})", entry.title, entry.entry_id);
        Ok(entry)
    }
}
