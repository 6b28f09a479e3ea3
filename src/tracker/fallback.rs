//! Fallback tracker.
//!
//! # Responsibilities
//! - Periodically probe every eligible endpoint concurrently
//! - Ban endpoints after consecutive failures, restore them after the ban
//! - Keep a primary/secondary selection that callers read without waiting
//! - Publish `endpointBanned` / `endpointsUpdated` on the event bus
//!
//! # Design Decisions
//! - Sweeps are serialized; a slow sweep delays the next tick instead of overlapping
//! - Each probe has its own deadline, so one hung endpoint cannot stall a sweep
//! - Results from a cancelled sweep are dropped before touching the registry
//! - Selection is recomputed under the registry lock, events published after it is released

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{EventBus, TrackerEvent};
use crate::health::{
    Ban, CheckResult, EndpointProbe, EndpointRegistry, EndpointStats, FailureOutcome, ProbeError,
};
use crate::observability::metrics;
use crate::selection::{SelectionContext, SelectionStrategy};
use crate::tracker::types::{Selection, TrackOptions, TrackerError, TrackerOptions, TrackerPolicy};

/// Monitors a fixed pool of endpoints for one logical service.
pub struct FallbackTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    key: String,
    policy: TrackerPolicy,
    probe: Arc<dyn EndpointProbe>,
    strategy: Arc<dyn SelectionStrategy>,
    registry: Mutex<EndpointRegistry>,
    selection: ArcSwap<Selection>,
    selection_tx: watch::Sender<Selection>,
    bus: EventBus,
    /// Cancellation token of the running loop; `None` when not tracking.
    session: Mutex<Option<CancellationToken>>,
    sweep_lock: tokio::sync::Mutex<()>,
}

impl FallbackTracker {
    /// Create a tracker. Fails fast on an empty endpoint set, an initial
    /// selection outside the set, or a zero threshold/interval.
    pub fn new(options: TrackerOptions, bus: EventBus) -> Result<Self, TrackerError> {
        let TrackerOptions {
            key,
            endpoints,
            primary,
            secondary,
            probe,
            strategy,
            policy,
        } = options;

        if policy.consecutive_failure_threshold == 0 {
            return Err(TrackerError::InvalidPolicy {
                key,
                reason: "consecutive_failure_threshold must be at least 1",
            });
        }
        if policy.check_interval.is_zero() {
            return Err(TrackerError::InvalidPolicy {
                key,
                reason: "check_interval must be non-zero",
            });
        }

        let registry = EndpointRegistry::new(
            endpoints,
            policy.consecutive_failure_threshold,
            policy.ban_duration,
        );
        let Some(first) = registry.endpoints().next().map(str::to_string) else {
            return Err(TrackerError::NoEndpoints(key));
        };

        for endpoint in primary.iter().chain(secondary.iter()) {
            if !registry.contains(endpoint) {
                return Err(TrackerError::UnknownEndpoint {
                    key,
                    endpoint: endpoint.clone(),
                });
            }
        }

        let primary = primary.unwrap_or(first);
        let secondary = match secondary {
            Some(s) if s != primary || registry.len() == 1 => s,
            _ => other_than(&registry, &primary),
        };
        let initial = Selection { primary, secondary };

        tracing::debug!(
            tracker = %key,
            endpoints = registry.len(),
            primary = %initial.primary,
            secondary = %initial.secondary,
            "Tracker created"
        );

        let (selection_tx, _) = watch::channel(initial.clone());
        Ok(Self {
            inner: Arc::new(TrackerInner {
                key,
                policy,
                probe,
                strategy,
                registry: Mutex::new(registry),
                selection: ArcSwap::from_pointee(initial),
                selection_tx,
                bus,
                session: Mutex::new(None),
                sweep_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn policy(&self) -> TrackerPolicy {
        self.inner.policy
    }

    /// Start the periodic sweep loop. No-op if already tracking.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn track(&self, options: TrackOptions) {
        let mut session = self.inner.lock_session();
        if session.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        tokio::spawn(run_loop(
            Arc::downgrade(&self.inner),
            cancel.clone(),
            self.inner.policy,
            options.warm_up,
        ));
        *session = Some(cancel);

        tracing::info!(
            tracker = %self.inner.key,
            interval_ms = self.inner.policy.check_interval.as_millis() as u64,
            warm_up = options.warm_up,
            "Tracking started"
        );
    }

    /// Stop the loop and cancel in-flight probes. Idempotent.
    pub fn stop_tracking(&self) {
        if let Some(cancel) = self.inner.lock_session().take() {
            cancel.cancel();
            tracing::info!(tracker = %self.inner.key, "Tracking stopped");
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.inner.lock_session().is_some()
    }

    /// Run one sweep now, serialized with the loop. Returns false if the
    /// sweep was cancelled and its results discarded.
    ///
    /// While tracking, the sweep shares the loop's cancellation; otherwise it
    /// runs to completion on its own.
    pub async fn sweep_once(&self) -> bool {
        let cancel = self.inner.lock_session().clone().unwrap_or_default();
        self.inner.sweep(&cancel).await
    }

    /// Count a failed live request against `endpoint`.
    ///
    /// Bans the endpoint once the failure threshold is reached and reselects
    /// immediately. Unknown URLs are ignored.
    pub fn report_failure(&self, endpoint: &str) {
        let inner = &self.inner;
        let events = {
            let mut registry = inner.lock_registry();
            let now = Instant::now();
            match registry.record_failure(endpoint, "live request failed", now) {
                FailureOutcome::Unknown => {
                    tracing::debug!(tracker = %inner.key, endpoint, "Failure reported for unknown endpoint");
                    return;
                }
                FailureOutcome::Recorded { consecutive_failures } => {
                    tracing::debug!(tracker = %inner.key, endpoint, consecutive_failures, "Failure reported");
                    return;
                }
                FailureOutcome::Banned(ban) => {
                    let mut events = vec![inner.on_ban(ban)];
                    events.extend(inner.reselect(&registry, now));
                    events
                }
            }
        };
        inner.publish(events);
    }

    pub fn pick_primary_endpoint(&self) -> String {
        self.inner.selection.load().primary.clone()
    }

    pub fn pick_secondary_endpoint(&self) -> String {
        self.inner.selection.load().secondary.clone()
    }

    pub fn selection(&self) -> Selection {
        Selection::clone(&self.inner.selection.load())
    }

    /// Receiver that observes every selection change.
    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.inner.selection_tx.subscribe()
    }

    /// Snapshot of every endpoint, in configuration order.
    pub fn endpoint_stats(&self) -> Vec<EndpointStats> {
        self.inner.lock_registry().stats(Instant::now())
    }

    /// True while `endpoint` is serving a ban.
    pub fn is_banned(&self, endpoint: &str) -> bool {
        self.inner.lock_registry().is_banned(endpoint, Instant::now())
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.inner
            .lock_registry()
            .endpoints()
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Debug for FallbackTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackTracker")
            .field("key", &self.inner.key)
            .field("selection", &self.selection())
            .field("tracking", &self.is_tracking())
            .finish()
    }
}

async fn run_loop(
    inner: Weak<TrackerInner>,
    cancel: CancellationToken,
    policy: TrackerPolicy,
    warm_up: bool,
) {
    let start = if warm_up {
        Instant::now()
    } else {
        Instant::now() + policy.check_interval
    };
    let mut ticker = time::interval_at(start, policy.check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.sweep(&cancel).await;
            }
        }
    }
    tracing::debug!("Sweep loop exited");
}

impl TrackerInner {
    fn lock_registry(&self) -> MutexGuard<'_, EndpointRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn sweep(&self, cancel: &CancellationToken) -> bool {
        let _serial = self.sweep_lock.lock().await;
        if cancel.is_cancelled() {
            return false;
        }

        let targets = {
            let mut registry = self.lock_registry();
            let now = Instant::now();
            self.lift_expired_bans(&mut registry, now);
            registry.probe_targets(now)
        };

        let results = join_all(targets.iter().map(|endpoint| self.probe_one(endpoint, cancel))).await;

        if cancel.is_cancelled() {
            tracing::debug!(tracker = %self.key, "Sweep cancelled, discarding results");
            return false;
        }

        let events = {
            let mut registry = self.lock_registry();
            let now = Instant::now();
            let mut events = Vec::new();

            for (endpoint, result) in targets.iter().zip(results) {
                let Ok(result) = result else { continue };

                metrics::record_endpoint_health(&self.key, endpoint, result.success);
                if result.success {
                    metrics::record_probe_latency(&self.key, endpoint, result.latency);
                } else {
                    tracing::debug!(
                        tracker = %self.key,
                        endpoint = %endpoint,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Health check failed"
                    );
                }

                if let Some(ban) = registry.record_check(endpoint, result, now) {
                    events.push(self.on_ban(ban));
                }
            }

            self.lift_expired_bans(&mut registry, now);
            events.extend(self.reselect(&registry, now));
            events
        };

        self.publish(events);
        true
    }

    fn lift_expired_bans(&self, registry: &mut EndpointRegistry, now: Instant) {
        for endpoint in registry.lift_expired_bans(now) {
            tracing::info!(tracker = %self.key, endpoint = %endpoint, "Ban expired, endpoint eligible again");
        }
    }

    async fn probe_one(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        let started = Instant::now();
        let deadline = self.policy.probe_timeout;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            outcome = time::timeout(deadline, self.probe.check(endpoint, cancel)) => match outcome {
                Ok(result) => result,
                Err(_) => Ok(CheckResult::failure(
                    started.elapsed(),
                    format!("timed out after {}ms", deadline.as_millis()),
                )),
            },
        }
    }

    fn on_ban(&self, ban: Ban) -> TrackerEvent {
        tracing::warn!(
            tracker = %self.key,
            endpoint = %ban.endpoint,
            reason = %ban.reason,
            ban_secs = self.policy.ban_duration.as_secs(),
            "Endpoint banned"
        );
        metrics::record_endpoint_banned(&self.key, &ban.endpoint);
        TrackerEvent::EndpointBanned {
            endpoint: ban.endpoint,
            reason: ban.reason,
        }
    }

    /// Recompute the selection from the current registry state.
    /// Returns an `EndpointsUpdated` event only if it changed.
    fn reselect(&self, registry: &EndpointRegistry, now: Instant) -> Option<TrackerEvent> {
        let stats = registry.stats(now);
        let ctx = SelectionContext::new(&stats)?;

        let mut primary = self.strategy.select_primary(&ctx);
        if !registry.contains(&primary) {
            tracing::warn!(tracker = %self.key, endpoint = %primary, "Strategy chose an unknown primary");
            primary = ctx.fallback().to_string();
        }
        let mut secondary = self.strategy.select_secondary(&ctx, &primary);
        if !registry.contains(&secondary) || (secondary == primary && registry.len() > 1) {
            secondary = other_than(registry, &primary);
        }

        let next = Selection { primary, secondary };
        if **self.selection.load() == next {
            return None;
        }

        tracing::info!(
            tracker = %self.key,
            primary = %next.primary,
            secondary = %next.secondary,
            "Endpoints updated"
        );
        self.selection.store(Arc::new(next.clone()));
        self.selection_tx.send_replace(next.clone());
        metrics::record_selection_change(&self.key);

        Some(TrackerEvent::EndpointsUpdated {
            primary: next.primary,
            secondary: next.secondary,
            endpoints_stats: stats,
        })
    }

    fn publish(&self, events: Vec<TrackerEvent>) {
        for event in &events {
            self.bus.publish(&self.key, event);
        }
    }
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = session.take() {
            cancel.cancel();
        }
    }
}

/// First endpoint in configuration order that differs from `primary`, or
/// `primary` itself for a single-endpoint registry.
fn other_than(registry: &EndpointRegistry, primary: &str) -> String {
    registry
        .endpoints()
        .find(|endpoint| *endpoint != primary)
        .unwrap_or(primary)
        .to_string()
}
