//! Tracker event payloads.

use std::fmt;

use serde::Serialize;

use crate::health::EndpointStats;

/// Event names a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    EndpointBanned,
    EndpointsUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::EndpointBanned => "endpointBanned",
            EventKind::EndpointsUpdated => "endpointsUpdated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change published by a tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TrackerEvent {
    /// An endpoint crossed the failure threshold and is excluded from selection.
    EndpointBanned { endpoint: String, reason: String },

    /// Primary or secondary changed.
    EndpointsUpdated {
        primary: String,
        secondary: String,
        endpoints_stats: Vec<EndpointStats>,
    },
}

impl TrackerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TrackerEvent::EndpointBanned { .. } => EventKind::EndpointBanned,
            TrackerEvent::EndpointsUpdated { .. } => EventKind::EndpointsUpdated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = TrackerEvent::EndpointBanned {
            endpoint: "https://rpc.example.org".into(),
            reason: "3 consecutive failures".into(),
        };
        assert_eq!(event.kind(), EventKind::EndpointBanned);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "endpointBanned");
        assert_eq!(json["endpoint"], "https://rpc.example.org");
    }
}
