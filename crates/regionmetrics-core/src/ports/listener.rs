//! Coordinator update listener port.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::region::RegionRecord;

/// Reader notified once per successful refresh.
///
/// Errors returned here are logged by the coordinator and never abort delivery
/// to the listeners registered after this one.
#[async_trait]
pub trait UpdateListener: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Handle a freshly cached record.
    async fn on_update(&self, record: &RegionRecord) -> Result<(), CoreError>;
}
