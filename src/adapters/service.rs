//! Memoized trackers for one kind of service.
//!
//! # Responsibilities
//! - Hold the static endpoint configuration for every chain of one service kind
//! - Create each chain's tracker on first use and keep it for the lifetime of
//!   this registry, so warm state is never lost
//! - Expose the narrow caller surface (`current_urls`, `watch_urls`, `mark_failed`)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;

use crate::events::EventBus;
use crate::health::EndpointProbe;
use crate::selection::SelectionStrategy;
use crate::tracker::{FallbackTracker, Selection, TrackOptions, TrackerError, TrackerOptions, TrackerPolicy};

/// Identity of a logical service instance: the chain it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServiceId(pub u64);

impl From<u64> for ServiceId {
    fn from(chain_id: u64) -> Self {
        Self(chain_id)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-facing surface of a domain adapter.
pub trait EndpointService {
    /// Endpoints to use right now. Never blocks on a health check.
    fn current_urls(&self, id: ServiceId) -> Result<Selection, TrackerError>;

    /// Receiver notified whenever the tracker's selection changes.
    fn watch_urls(&self, id: ServiceId) -> Result<watch::Receiver<Selection>, TrackerError>;

    /// Report a failed live request against `url`.
    fn mark_failed(&self, id: ServiceId, url: &str) -> Result<(), TrackerError>;
}

struct ServiceEntry {
    endpoints: Vec<String>,
    policy: TrackerPolicy,
    strategy: Arc<dyn SelectionStrategy>,
}

/// Registry of lazily created, process-lifetime trackers keyed by [`ServiceId`].
pub struct ServiceTrackers {
    kind: &'static str,
    bus: EventBus,
    probe: Arc<dyn EndpointProbe>,
    entries: HashMap<ServiceId, ServiceEntry>,
    trackers: DashMap<ServiceId, Arc<FallbackTracker>>,
}

impl ServiceTrackers {
    /// `kind` prefixes every tracker key (`<kind>:<chain id>`).
    pub fn new(kind: &'static str, probe: Arc<dyn EndpointProbe>, bus: EventBus) -> Self {
        Self {
            kind,
            bus,
            probe,
            entries: HashMap::new(),
            trackers: DashMap::new(),
        }
    }

    /// Declare the endpoints for one service. Later declarations replace earlier ones.
    pub fn register(
        &mut self,
        id: ServiceId,
        endpoints: Vec<String>,
        policy: TrackerPolicy,
        strategy: Arc<dyn SelectionStrategy>,
    ) {
        self.entries.insert(
            id,
            ServiceEntry {
                endpoints,
                policy,
                strategy,
            },
        );
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn tracker_key(&self, id: ServiceId) -> String {
        format!("{}:{}", self.kind, id)
    }

    /// Configured services, in ascending order.
    pub fn services(&self) -> Vec<ServiceId> {
        let mut ids: Vec<ServiceId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    /// The tracker for `id`, created on first use.
    pub fn tracker(&self, id: ServiceId) -> Result<Arc<FallbackTracker>, TrackerError> {
        if let Some(existing) = self.trackers.get(&id) {
            return Ok(Arc::clone(&existing));
        }

        let declared = self
            .entries
            .get(&id)
            .ok_or_else(|| TrackerError::UnknownService(self.tracker_key(id)))?;

        match self.trackers.entry(id) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let options = TrackerOptions::new(
                    self.tracker_key(id),
                    declared.endpoints.clone(),
                    Arc::clone(&self.probe),
                )
                .with_strategy(Arc::clone(&declared.strategy))
                .with_policy(declared.policy);

                let tracker = Arc::new(FallbackTracker::new(options, self.bus.clone())?);
                entry.insert(Arc::clone(&tracker));
                Ok(tracker)
            }
        }
    }

    /// Create (if needed) and start every configured tracker.
    pub fn track_all(&self, options: TrackOptions) -> Result<(), TrackerError> {
        for id in self.services() {
            self.tracker(id)?.track(options);
        }
        Ok(())
    }

    /// Stop every tracker created so far.
    pub fn stop_all(&self) {
        for entry in self.trackers.iter() {
            entry.value().stop_tracking();
        }
    }
}

impl EndpointService for ServiceTrackers {
    fn current_urls(&self, id: ServiceId) -> Result<Selection, TrackerError> {
        Ok(self.tracker(id)?.selection())
    }

    fn watch_urls(&self, id: ServiceId) -> Result<watch::Receiver<Selection>, TrackerError> {
        Ok(self.tracker(id)?.subscribe())
    }

    fn mark_failed(&self, id: ServiceId, url: &str) -> Result<(), TrackerError> {
        self.tracker(id)?.report_failure(url);
        Ok(())
    }
}

impl fmt::Debug for ServiceTrackers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTrackers")
            .field("kind", &self.kind)
            .field("services", &self.services())
            .field("live_trackers", &self.trackers.len())
            .finish()
    }
}
