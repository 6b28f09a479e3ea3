//! Tracker configuration, selection state and error definitions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::TrackerPolicyConfig;
use crate::health::EndpointProbe;
use crate::selection::{LowestLatency, SelectionStrategy};

/// Sweep cadence and ban policy for one tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerPolicy {
    pub check_interval: Duration,
    pub probe_timeout: Duration,
    pub ban_duration: Duration,
    pub consecutive_failure_threshold: u32,
}

impl Default for TrackerPolicy {
    fn default() -> Self {
        TrackerPolicyConfig::default().into()
    }
}

impl From<TrackerPolicyConfig> for TrackerPolicy {
    fn from(config: TrackerPolicyConfig) -> Self {
        Self {
            check_interval: config.check_interval(),
            probe_timeout: config.probe_timeout(),
            ban_duration: config.ban_duration(),
            consecutive_failure_threshold: config.consecutive_failure_threshold,
        }
    }
}

/// The endpoints callers should currently use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    pub primary: String,
    pub secondary: String,
}

/// Options for [`FallbackTracker::track`](crate::tracker::FallbackTracker::track).
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackOptions {
    /// Run the first sweep immediately instead of after one interval.
    pub warm_up: bool,
}

impl TrackOptions {
    pub fn warm_up() -> Self {
        Self { warm_up: true }
    }
}

/// Everything needed to construct a tracker.
#[derive(Clone)]
pub struct TrackerOptions {
    /// Process-wide unique identity used for event routing.
    pub key: String,
    pub endpoints: Vec<String>,
    /// Initial guesses; replaced after the first sweep.
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub probe: Arc<dyn EndpointProbe>,
    pub strategy: Arc<dyn SelectionStrategy>,
    pub policy: TrackerPolicy,
}

impl TrackerOptions {
    pub fn new(key: impl Into<String>, endpoints: Vec<String>, probe: Arc<dyn EndpointProbe>) -> Self {
        Self {
            key: key.into(),
            endpoints,
            primary: None,
            secondary: None,
            probe,
            strategy: Arc::new(LowestLatency::new()),
            policy: TrackerPolicy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_policy(mut self, policy: TrackerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_initial(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary = Some(primary.into());
        self.secondary = Some(secondary.into());
        self
    }
}

impl fmt::Debug for TrackerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerOptions")
            .field("key", &self.key)
            .field("endpoints", &self.endpoints)
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Errors raised by trackers and the adapters that own them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The tracker was configured without endpoints.
    #[error("tracker '{0}' has no endpoints")]
    NoEndpoints(String),

    /// An initial primary/secondary is not in the endpoint set.
    #[error("tracker '{key}': '{endpoint}' is not a configured endpoint")]
    UnknownEndpoint { key: String, endpoint: String },

    /// A policy knob is out of range.
    #[error("tracker '{key}': {reason}")]
    InvalidPolicy { key: String, reason: &'static str },

    /// An adapter was asked for a service it has no endpoints for.
    #[error("no endpoints configured for {0}")]
    UnknownService(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = TrackerPolicy::default();
        assert_eq!(policy.check_interval, Duration::from_secs(30));
        assert_eq!(policy.ban_duration, Duration::from_secs(120));
        assert_eq!(policy.consecutive_failure_threshold, 3);
    }

    #[test]
    fn test_error_display() {
        let err = TrackerError::UnknownEndpoint {
            key: "rpc:1".into(),
            endpoint: "https://nope".into(),
        };
        assert_eq!(
            err.to_string(),
            "tracker 'rpc:1': 'https://nope' is not a configured endpoint"
        );
    }
}
