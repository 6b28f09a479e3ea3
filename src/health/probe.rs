//! Health probe contract.
//!
//! # Responsibilities
//! - Define the result of a single health check
//! - Define the trait a domain implements to probe one endpoint
//!
//! # Design Decisions
//! - Probes report unhealthy endpoints as a failed `CheckResult`, never as an error
//! - Cancellation is the only error a probe may return
//! - Probes are stateless; the tracker owns everything they observe

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Domain statistics carried by a check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckStats {
    /// Latest block height reported by an RPC node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Number of tickers served by an oracle keeper.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker_count: Option<u64>,
}

/// Outcome of one health check against one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub success: bool,
    /// Wall-clock time of the check, in unix milliseconds.
    pub checked_at_ms: u64,
    #[serde(serialize_with = "serialize_millis", rename = "latency_ms")]
    pub latency: Duration,
    pub stats: CheckStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn success(latency: Duration, stats: CheckStats) -> Self {
        Self {
            success: true,
            checked_at_ms: unix_millis(),
            latency,
            stats,
            error: None,
        }
    }

    pub fn failure(latency: Duration, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            checked_at_ms: unix_millis(),
            latency,
            stats: CheckStats::default(),
            error: Some(reason.into()),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Errors a probe is allowed to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The owning tracker stopped while the check was in flight.
    #[error("health check cancelled")]
    Cancelled,
}

/// Performs one health check against one endpoint.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    /// Check `endpoint`. Implementations should return early with
    /// [`ProbeError::Cancelled`] once `cancel` fires.
    async fn check(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, ProbeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_carries_reason() {
        let result = CheckResult::failure(Duration::from_millis(12), "status 503");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("status 503"));
        assert_eq!(result.stats, CheckStats::default());
        assert!(result.checked_at_ms > 0);
    }

    #[test]
    fn test_serializes_latency_as_millis() {
        let result = CheckResult::success(
            Duration::from_millis(250),
            CheckStats {
                block_number: Some(19_000_000),
                ticker_count: None,
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["latency_ms"], 250);
        assert_eq!(json["stats"]["block_number"], 19_000_000);
        assert!(json["stats"].get("ticker_count").is_none());
        assert!(json.get("error").is_none());
    }
}
