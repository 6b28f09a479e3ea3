//! Oracle keeper mirror failover.
//!
//! # Responsibilities
//! - Probe keeper mirrors by fetching their ticker list
//! - Rank mirrors by latency
//! - Escalate bursts of live failures into a per-chain degraded mode
//!
//! # Design Decisions
//! - A keeper answering 2xx with an empty or non-array body is unhealthy
//! - In degraded mode callers are handed the secondary mirror as primary
//!   until the switcher restores normal mode, unless that mirror is banned

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::adapters::service::{EndpointService, ServiceId, ServiceTrackers};
use crate::config::{OracleServiceConfig, TrackerPolicyConfig};
use crate::events::EventBus;
use crate::health::{CheckResult, CheckStats, EndpointProbe, ProbeError};
use crate::resilience::{SlidingWindowFallbackSwitcher, SwitcherConfig};
use crate::selection::LowestLatency;
use crate::tracker::{Selection, TrackerError};

const TICKERS_PATH: &str = "/prices/tickers";

/// Health probe that fetches a keeper's ticker list.
#[derive(Debug, Clone, Default)]
pub struct OracleProbe {
    client: reqwest::Client,
}

impl OracleProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_tickers(&self, endpoint: &str) -> CheckResult {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), TICKERS_PATH);
        let started = Instant::now();

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return CheckResult::failure(started.elapsed(), format!("transport error: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return CheckResult::failure(started.elapsed(), format!("status {}", status.as_u16()));
        }

        match response.json::<Value>().await {
            Ok(Value::Array(tickers)) if !tickers.is_empty() => CheckResult::success(
                started.elapsed(),
                CheckStats {
                    block_number: None,
                    ticker_count: Some(tickers.len() as u64),
                },
            ),
            Ok(_) => CheckResult::failure(started.elapsed(), "empty or malformed ticker list"),
            Err(e) => CheckResult::failure(started.elapsed(), format!("decode error: {}", e)),
        }
    }
}

#[async_trait]
impl EndpointProbe for OracleProbe {
    async fn check(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = self.fetch_tickers(endpoint) => Ok(result),
        }
    }
}

/// Per-chain oracle keeper trackers with a degraded-mode switcher each.
#[derive(Debug)]
pub struct OracleKeepers {
    trackers: ServiceTrackers,
    switcher_config: SwitcherConfig,
    switchers: DashMap<ServiceId, Arc<SlidingWindowFallbackSwitcher>>,
}

impl OracleKeepers {
    pub fn new(
        services: &[OracleServiceConfig],
        default_policy: TrackerPolicyConfig,
        switcher_config: SwitcherConfig,
        bus: EventBus,
    ) -> Self {
        Self::with_probe(
            services,
            default_policy,
            switcher_config,
            Arc::new(OracleProbe::default()),
            bus,
        )
    }

    /// Same as [`OracleKeepers::new`] with a custom probe.
    pub fn with_probe(
        services: &[OracleServiceConfig],
        default_policy: TrackerPolicyConfig,
        switcher_config: SwitcherConfig,
        probe: Arc<dyn EndpointProbe>,
        bus: EventBus,
    ) -> Self {
        let mut trackers = ServiceTrackers::new("oracle", probe, bus);
        for service in services {
            trackers.register(
                ServiceId(service.chain_id),
                service.endpoints.clone(),
                service.policy.unwrap_or(default_policy).into(),
                Arc::new(LowestLatency::new()),
            );
        }
        Self {
            trackers,
            switcher_config,
            switchers: DashMap::new(),
        }
    }

    pub fn trackers(&self) -> &ServiceTrackers {
        &self.trackers
    }

    /// True while `id` is in degraded mode.
    pub fn is_degraded(&self, id: ServiceId) -> bool {
        self.switchers
            .get(&id)
            .is_some_and(|switcher| switcher.is_fallback_mode())
    }

    fn switcher(&self, id: ServiceId) -> Arc<SlidingWindowFallbackSwitcher> {
        let entry = self.switchers.entry(id).or_insert_with(|| {
            Arc::new(SlidingWindowFallbackSwitcher::new(
                self.trackers.tracker_key(id),
                self.switcher_config,
            ))
        });
        Arc::clone(entry.value())
    }
}

impl EndpointService for OracleKeepers {
    fn current_urls(&self, id: ServiceId) -> Result<Selection, TrackerError> {
        let tracker = self.trackers.tracker(id)?;
        let selection = tracker.selection();
        // Never promote a banned mirror; the tracker already ranked it last.
        if self.is_degraded(id)
            && selection.secondary != selection.primary
            && !tracker.is_banned(&selection.secondary)
        {
            return Ok(Selection {
                primary: selection.secondary,
                secondary: selection.primary,
            });
        }
        Ok(selection)
    }

    /// Observes the tracker's ranking; degraded-mode swaps are applied only by
    /// [`EndpointService::current_urls`].
    fn watch_urls(&self, id: ServiceId) -> Result<watch::Receiver<Selection>, TrackerError> {
        self.trackers.watch_urls(id)
    }

    /// Must be called from within a Tokio runtime (the switcher arms a timer).
    fn mark_failed(&self, id: ServiceId, url: &str) -> Result<(), TrackerError> {
        self.trackers.mark_failed(id, url)?;
        self.switcher(id).trigger();
        Ok(())
    }
}
