//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build adapters → track_all(warm_up)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Shutdown::trigger → background loops exit → stop_all
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging/metrics, then trackers
//! - Trackers are stopped explicitly so in-flight probes are cancelled

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
