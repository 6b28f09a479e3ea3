//! Blockchain RPC node failover.
//!
//! # Responsibilities
//! - Probe JSON-RPC nodes with `eth_blockNumber`
//! - Prefer in-sync nodes, then the lowest latency
//! - Expose per-chain primary/secondary RPC URLs to the call layer

use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::adapters::service::{EndpointService, ServiceId, ServiceTrackers};
use crate::config::{RpcServiceConfig, TrackerPolicyConfig};
use crate::events::EventBus;
use crate::health::{CheckResult, CheckStats, EndpointProbe, ProbeError};
use crate::selection::FreshestLowestLatency;
use crate::tracker::{Selection, TrackerError};

/// Health probe that asks a node for its latest block number.
#[derive(Debug, Default, Clone, Copy)]
pub struct RpcProbe;

#[async_trait]
impl EndpointProbe for RpcProbe {
    async fn check(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        let url: url::Url = match endpoint.parse() {
            Ok(url) => url,
            Err(e) => return Ok(CheckResult::failure(Duration::ZERO, format!("invalid RPC URL: {}", e))),
        };

        let started = Instant::now();
        let provider = ProviderBuilder::new().connect_http(url);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = async { provider.get_block_number().await } => Ok(match result {
                Ok(block_number) => CheckResult::success(
                    started.elapsed(),
                    CheckStats {
                        block_number: Some(block_number),
                        ticker_count: None,
                    },
                ),
                Err(e) => CheckResult::failure(started.elapsed(), format!("RPC error: {}", e)),
            }),
        }
    }
}

/// Per-chain RPC node trackers.
#[derive(Debug)]
pub struct RpcProviders {
    trackers: ServiceTrackers,
}

impl RpcProviders {
    pub fn new(services: &[RpcServiceConfig], default_policy: TrackerPolicyConfig, bus: EventBus) -> Self {
        Self::with_probe(services, default_policy, Arc::new(RpcProbe), bus)
    }

    /// Same as [`RpcProviders::new`] with a custom probe.
    pub fn with_probe(
        services: &[RpcServiceConfig],
        default_policy: TrackerPolicyConfig,
        probe: Arc<dyn EndpointProbe>,
        bus: EventBus,
    ) -> Self {
        let mut trackers = ServiceTrackers::new("rpc", probe, bus);
        for service in services {
            trackers.register(
                ServiceId(service.chain_id),
                service.endpoints.clone(),
                service.policy.unwrap_or(default_policy).into(),
                Arc::new(FreshestLowestLatency::new(service.max_block_lag)),
            );
        }
        Self { trackers }
    }

    pub fn trackers(&self) -> &ServiceTrackers {
        &self.trackers
    }
}

impl EndpointService for RpcProviders {
    fn current_urls(&self, id: ServiceId) -> Result<Selection, TrackerError> {
        self.trackers.current_urls(id)
    }

    fn watch_urls(&self, id: ServiceId) -> Result<watch::Receiver<Selection>, TrackerError> {
        self.trackers.watch_urls(id)
    }

    fn mark_failed(&self, id: ServiceId, url: &str) -> Result<(), TrackerError> {
        self.trackers.mark_failed(id, url)
    }
}
