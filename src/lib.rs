//! Endpoint failover for redundant RPC nodes and oracle keeper mirrors.

pub mod adapters;
pub mod config;
pub mod events;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod selection;
pub mod tracker;

pub use adapters::{EndpointService, OracleKeepers, RpcProviders, ServiceId};
pub use config::FailoverConfig;
pub use events::{EventBus, EventKind, TrackerEvent};
pub use resilience::SlidingWindowFallbackSwitcher;
pub use tracker::{FallbackTracker, Selection, TrackOptions, TrackerOptions};
