//! Per-tracker endpoint registry.
//!
//! # States
//! - Eligible: endpoint is probed and may be selected
//! - Banned: endpoint skipped by sweeps until `banned_until` elapses
//!
//! # State Transitions
//! ```text
//! Eligible → Banned: consecutive_failures >= threshold
//! Banned → Eligible: sweep observes banned_until <= now (counter reset)
//! ```
//!
//! # Design Decisions
//! - The endpoint set is fixed at construction and kept in input order
//! - Scheduled checks and live-request failures share one failure counter
//! - A successful check resets the counter

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::health::probe::CheckResult;

/// Everything the tracker knows about one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    pub endpoint: String,
    pub last_check: Option<CheckResult>,
    pub consecutive_failures: u32,
    pub banned_until: Option<Instant>,
}

impl EndpointRecord {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            last_check: None,
            consecutive_failures: 0,
            banned_until: None,
        }
    }

    pub fn is_banned(&self, now: Instant) -> bool {
        self.banned_until.is_some_and(|until| until > now)
    }
}

/// Snapshot of one endpoint, as published to observers and strategies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub check_result: Option<CheckResult>,
    pub consecutive_failures: u32,
    pub banned: bool,
}

impl EndpointStats {
    /// Latency of the last check, if it succeeded.
    pub fn healthy_latency(&self) -> Option<Duration> {
        self.check_result
            .as_ref()
            .filter(|r| r.success)
            .map(|r| r.latency)
    }

    pub fn block_number(&self) -> Option<u64> {
        self.check_result
            .as_ref()
            .filter(|r| r.success)
            .and_then(|r| r.stats.block_number)
    }
}

/// An endpoint that just crossed the failure threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ban {
    pub endpoint: String,
    pub reason: String,
    pub until: Instant,
}

/// Result of reporting a failure against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The URL is not part of this registry.
    Unknown,
    /// Counted; the endpoint is still eligible (or was already banned).
    Recorded { consecutive_failures: u32 },
    /// This failure banned the endpoint.
    Banned(Ban),
}

/// Ordered set of endpoint records owned by one tracker.
#[derive(Debug)]
pub struct EndpointRegistry {
    records: Vec<EndpointRecord>,
    failure_threshold: u32,
    ban_duration: Duration,
}

impl EndpointRegistry {
    /// Create a registry. Duplicate URLs collapse onto their first occurrence.
    pub fn new<I>(endpoints: I, failure_threshold: u32, ban_duration: Duration) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut records: Vec<EndpointRecord> = Vec::new();
        for endpoint in endpoints {
            if !records.iter().any(|r| r.endpoint == endpoint) {
                records.push(EndpointRecord::new(endpoint));
            }
        }
        Self {
            records,
            failure_threshold: failure_threshold.max(1),
            ban_duration,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.get(endpoint).is_some()
    }

    pub fn get(&self, endpoint: &str) -> Option<&EndpointRecord> {
        self.records.iter().find(|r| r.endpoint == endpoint)
    }

    fn get_mut(&mut self, endpoint: &str) -> Option<&mut EndpointRecord> {
        self.records.iter_mut().find(|r| r.endpoint == endpoint)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.endpoint.as_str())
    }

    pub fn is_banned(&self, endpoint: &str, now: Instant) -> bool {
        self.get(endpoint).is_some_and(|r| r.is_banned(now))
    }

    /// Endpoints a sweep should probe.
    pub fn probe_targets(&self, now: Instant) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.is_banned(now))
            .map(|r| r.endpoint.clone())
            .collect()
    }

    /// Store a scheduled check result.
    pub fn record_check(&mut self, endpoint: &str, result: CheckResult, now: Instant) -> Option<Ban> {
        let (threshold, duration) = (self.failure_threshold, self.ban_duration);
        let record = self.get_mut(endpoint)?;

        let reason = result.error.clone();
        let success = result.success;
        record.last_check = Some(result);

        if success {
            record.consecutive_failures = 0;
            return None;
        }

        let reason = reason.unwrap_or_else(|| "health check failed".to_string());
        register_failure(record, threshold, duration, reason, now)
    }

    /// Count a failure observed outside the sweep cadence.
    pub fn record_failure(&mut self, endpoint: &str, reason: &str, now: Instant) -> FailureOutcome {
        let (threshold, duration) = (self.failure_threshold, self.ban_duration);
        let Some(record) = self.get_mut(endpoint) else {
            return FailureOutcome::Unknown;
        };

        match register_failure(record, threshold, duration, reason.to_string(), now) {
            Some(ban) => FailureOutcome::Banned(ban),
            None => FailureOutcome::Recorded {
                consecutive_failures: record.consecutive_failures,
            },
        }
    }

    /// Clear every ban whose deadline has passed. Returns the restored URLs.
    pub fn lift_expired_bans(&mut self, now: Instant) -> Vec<String> {
        let mut lifted = Vec::new();
        for record in &mut self.records {
            if record.banned_until.is_some_and(|until| until <= now) {
                record.banned_until = None;
                record.consecutive_failures = 0;
                lifted.push(record.endpoint.clone());
            }
        }
        lifted
    }

    /// Snapshot of every endpoint in input order.
    pub fn stats(&self, now: Instant) -> Vec<EndpointStats> {
        self.records
            .iter()
            .map(|r| EndpointStats {
                endpoint: r.endpoint.clone(),
                check_result: r.last_check.clone(),
                consecutive_failures: r.consecutive_failures,
                banned: r.is_banned(now),
            })
            .collect()
    }
}

fn register_failure(
    record: &mut EndpointRecord,
    threshold: u32,
    duration: Duration,
    reason: String,
    now: Instant,
) -> Option<Ban> {
    if record.is_banned(now) {
        return None;
    }

    record.consecutive_failures = record.consecutive_failures.saturating_add(1);
    if record.consecutive_failures < threshold {
        return None;
    }

    let until = now + duration;
    record.banned_until = Some(until);
    Some(Ban {
        endpoint: record.endpoint.clone(),
        reason: format!(
            "{} consecutive failures, last: {}",
            record.consecutive_failures, reason
        ),
        until,
    })
}
