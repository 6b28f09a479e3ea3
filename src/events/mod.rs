//! Event subsystem.
//!
//! # Data Flow
//! ```text
//! FallbackTracker state change
//!     → TrackerEvent (types.rs)
//!     → EventBus::publish(tracker_key, event) (bus.rs)
//!     → listeners registered for (tracker_key, event kind)
//! ```
//!
//! # Design Decisions
//! - Topics are (tracker key, event kind); publishers and subscribers share
//!   only the bus handle and the key string
//! - Delivery is synchronous and at-most-once per state change
//! - No tracker lock is held while listeners run

pub mod bus;
pub mod types;

pub use bus::{EventBus, SubscriptionId};
pub use types::{EventKind, TrackerEvent};
