//! Domain adapters.
//!
//! # Data Flow
//! ```text
//! Static config (RpcServiceConfig / OracleServiceConfig)
//!     → rpc.rs / oracle.rs (probe + strategy per domain)
//!     → service.rs (one memoized FallbackTracker per chain)
//!     → EndpointService: current_urls / watch_urls / mark_failed
//! ```
//!
//! # Design Decisions
//! - Trackers are created on first use and kept for the adapter's lifetime
//! - Call sites only see URLs; they never touch trackers or registries

pub mod oracle;
pub mod rpc;
pub mod service;

pub use oracle::{OracleKeepers, OracleProbe};
pub use rpc::{RpcProbe, RpcProviders};
pub use service::{EndpointService, ServiceId, ServiceTrackers};
