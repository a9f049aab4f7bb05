//! HTTP metrics fetcher.
//!
//! `MetricsFetcher` port implementation. One GET per call, bounded by the
//! client timeout. No retries here: the coordinator owns the retry schedule.

use async_trait::async_trait;
use regionmetrics_core::error::CoreError;
use regionmetrics_core::models::region::{MetricsDocument, RegionRecord};
use regionmetrics_core::ports::fetcher::MetricsFetcher;
use std::time::Duration;
use tracing::debug;

/// reqwest-backed fetcher for the published metrics document
pub struct HttpMetricsFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpMetricsFetcher {
    /// Create a fetcher for `url` with a hard per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
        })
    }

    /// Download and parse the whole document.
    pub async fn fetch_document(&self) -> Result<MetricsDocument, CoreError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(CoreError::FetchFailed(format!(
                "unexpected status from {}: {status}",
                self.url
            )));
        }

        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        debug!("metrics document received: {} bytes", body.len());

        MetricsDocument::from_slice(&body)
    }

    fn transport_error(&self, e: reqwest::Error) -> CoreError {
        if e.is_timeout() {
            CoreError::FetchFailed(format!(
                "request to {} timed out after {:?}",
                self.url, self.timeout
            ))
        } else {
            CoreError::FetchFailed(format!("request to {} failed: {e}", self.url))
        }
    }
}

#[async_trait]
impl MetricsFetcher for HttpMetricsFetcher {
    async fn fetch(&self, region_id: &str) -> Result<RegionRecord, CoreError> {
        debug!("fetching metrics for region {region_id}");
        let document = self.fetch_document().await?;
        let record = document.region_record(region_id)?;
        debug!(
            "region {region_id}: {} metric(s) in record",
            record.metrics.len()
        );
        Ok(record)
    }
}
