//! Core error type.
//!
//! Adapter crates map their library errors into [`CoreError`] at the port boundary.

use thiserror::Error;

/// Core layer error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Upstream fetch failed (transport, timeout, non-200 status, decode)
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Region identifier is missing from both upstream mappings
    #[error("region not found in upstream metrics: {region_id}")]
    RegionNotFound {
        /// Region identifier that was looked up
        region_id: String,
    },

    /// Appending one statistic point failed
    #[error("append failed for {statistic_id}: {message}")]
    AppendFailed {
        /// Series the point belonged to
        statistic_id: String,
        /// Failure description
        message: String,
    },

    /// Statistics store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Field validation failed
    #[error("validation failed: {field}: {message}")]
    Validation {
        /// Name of the invalid field
        field: String,
        /// Failure reason
        message: String,
    },

    /// JSON serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal condition
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the refresh loop should keep stale data and retry on the next cycle.
    ///
    /// `RegionNotFound` counts as recoverable at refresh time: the upstream
    /// document may drop a region for one publication and restore it later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::FetchFailed(_) | CoreError::RegionNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(CoreError::FetchFailed("timeout".to_string()).is_retryable());
        assert!(CoreError::RegionNotFound {
            region_id: "US".to_string()
        }
        .is_retryable());
        assert!(!CoreError::Internal("bug".to_string()).is_retryable());
        assert!(!CoreError::Config("bad".to_string()).is_retryable());
    }

    #[test]
    fn display_includes_region() {
        let err = CoreError::RegionNotFound {
            region_id: "XX".to_string(),
        };
        assert!(err.to_string().contains("XX"));
    }
}
