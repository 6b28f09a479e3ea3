//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the failover monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FailoverConfig {
    /// Tracker policy shared by every service unless overridden.
    pub tracker: TrackerPolicyConfig,

    /// Degraded-mode switcher settings for oracle keepers.
    pub switcher: SwitcherSettings,

    /// Blockchain RPC endpoint groups, one per chain.
    pub rpc: Vec<RpcServiceConfig>,

    /// Oracle keeper mirror groups, one per chain.
    pub oracle: Vec<OracleServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Health-check cadence and ban policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerPolicyConfig {
    /// Interval between sweeps in milliseconds.
    pub check_interval_ms: u64,

    /// Per-probe deadline in milliseconds.
    pub probe_timeout_ms: u64,

    /// How long a banned endpoint stays excluded, in milliseconds.
    pub ban_duration_ms: u64,

    /// Consecutive failures before an endpoint is banned.
    pub consecutive_failure_threshold: u32,
}

impl Default for TrackerPolicyConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 30_000,
            probe_timeout_ms: 10_000,
            ban_duration_ms: 120_000,
            consecutive_failure_threshold: 3,
        }
    }
}

impl TrackerPolicyConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn ban_duration(&self) -> Duration {
        Duration::from_millis(self.ban_duration_ms)
    }
}

/// Sliding-window switcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SwitcherSettings {
    /// Events required inside the window to enter fallback mode.
    pub events_threshold: usize,

    /// Trailing window length in milliseconds.
    pub fallback_timeout_ms: u64,

    /// Fixed dwell time in fallback mode, in milliseconds.
    pub restore_timeout_ms: u64,
}

impl Default for SwitcherSettings {
    fn default() -> Self {
        Self {
            events_threshold: 3,
            fallback_timeout_ms: 5_000,
            restore_timeout_ms: 30_000,
        }
    }
}

/// One chain's JSON-RPC node pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcServiceConfig {
    /// Chain ID (e.g., 1 for Ethereum mainnet, 42161 for Arbitrum One).
    pub chain_id: u64,

    /// Candidate RPC URLs, in preference order.
    pub endpoints: Vec<String>,

    /// Blocks an endpoint may trail the best known head before it is demoted.
    #[serde(default = "default_max_block_lag")]
    pub max_block_lag: u64,

    /// Per-service override of the shared tracker policy.
    #[serde(default)]
    pub policy: Option<TrackerPolicyConfig>,
}

/// One chain's oracle keeper mirrors.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleServiceConfig {
    /// Chain ID the keepers serve prices for.
    pub chain_id: u64,

    /// Candidate keeper base URLs, in preference order.
    pub endpoints: Vec<String>,

    /// Per-service override of the shared tracker policy.
    #[serde(default)]
    pub policy: Option<TrackerPolicyConfig>,
}

fn default_max_block_lag() -> u64 {
    5
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: FailoverConfig = toml::from_str(
            r#"
            [[rpc]]
            chain_id = 42161
            endpoints = ["https://arb1.example.org", "https://arb2.example.org"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc.len(), 1);
        assert_eq!(config.rpc[0].max_block_lag, 5);
        assert!(config.rpc[0].policy.is_none());
        assert_eq!(config.tracker.consecutive_failure_threshold, 3);
        assert_eq!(config.tracker.ban_duration(), Duration::from_secs(120));
        assert_eq!(config.switcher.restore_timeout_ms, 30_000);
        assert!(config.oracle.is_empty());
    }

    #[test]
    fn test_policy_override() {
        let config: FailoverConfig = toml::from_str(
            r#"
            [tracker]
            check_interval_ms = 1000

            [[oracle]]
            chain_id = 1
            endpoints = ["https://keeper.example.org"]
            policy = { ban_duration_ms = 500 }
            "#,
        )
        .unwrap();

        assert_eq!(config.tracker.check_interval(), Duration::from_secs(1));
        let policy = config.oracle[0].policy.unwrap();
        assert_eq!(policy.ban_duration_ms, 500);
        // Unset fields in an override fall back to the defaults.
        assert_eq!(policy.check_interval_ms, 30_000);
    }
}
