//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Trackers and switchers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (tracker, endpoint) on every log line
//! - Metrics are cheap and safe to record with no exporter installed

pub mod logging;
pub mod metrics;
