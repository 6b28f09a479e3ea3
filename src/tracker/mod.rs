//! Endpoint failover tracking.
//!
//! # Data Flow
//! ```text
//! track() → sweep loop (fallback.rs)
//!     → EndpointProbe::check for every non-banned endpoint, concurrently
//!     → all probes settled (success, failure, or per-probe timeout)
//!     → EndpointRegistry updated, expired bans lifted
//!     → SelectionStrategy picks primary/secondary
//!     → EventBus: endpointBanned / endpointsUpdated
//!
//! report_failure(url) (live request failed)
//!     → registry failure count → ban at threshold → reselect → events
//!
//! pick_primary_endpoint() / pick_secondary_endpoint()
//!     → last computed selection, never blocks
//! ```

pub mod fallback;
pub mod types;

pub use fallback::FallbackTracker;
pub use types::{Selection, TrackOptions, TrackerError, TrackerOptions, TrackerPolicy};
