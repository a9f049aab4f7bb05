//! # regionmetrics-network
//!
//! HTTP adapter for the published metrics document.
//!
//! ```rust,ignore
//! use regionmetrics_network::http_fetcher::HttpMetricsFetcher;
//!
//! let fetcher = HttpMetricsFetcher::new(DEFAULT_METRICS_URL, Duration::from_secs(30))?;
//! let record = fetcher.fetch("US").await?;
//! ```

pub mod http_fetcher;
