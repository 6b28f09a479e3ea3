//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failure observed by a caller:
//!     → switcher.rs trigger() (record event, prune window)
//!     → threshold crossed within window → Fallback mode, restore timer armed
//!     → restore timer fires → Normal mode
//! ```
//!
//! # Design Decisions
//! - Mode is binary; callers decide what "fallback" means for them
//! - Hysteresis on both edges: a burst to enter, a fixed dwell to leave

pub mod switcher;

pub use switcher::{SlidingWindowFallbackSwitcher, SwitcherConfig};
