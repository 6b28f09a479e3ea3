//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (probe.rs):
//!     Sweep timer
//!     → EndpointProbe::check per endpoint
//!     → CheckResult recorded in registry.rs
//!
//! Passive health checks:
//!     Live request failure reported
//!     → Increment failure count in registry.rs
//!     → Ban if threshold exceeded
//!
//! State machine (registry.rs):
//!     Eligible ←→ Banned
//!     With a fixed ban duration to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Bans require consecutive failures and last a fixed time
//! - Health state is per-endpoint, owned by a single tracker

pub mod probe;
pub mod registry;

pub use probe::{CheckResult, CheckStats, EndpointProbe, ProbeError};
pub use registry::{Ban, EndpointRecord, EndpointRegistry, EndpointStats, FailureOutcome};
