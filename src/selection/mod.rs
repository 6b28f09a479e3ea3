//! Endpoint selection subsystem.
//!
//! # Data Flow
//! ```text
//! Sweep settled / failure reported
//!     → registry snapshot (EndpointStats, input order)
//!     → SelectionStrategy::rank
//!         - lowest_latency.rs (fastest healthy endpoint first)
//!         - block_height.rs (demote endpoints trailing the chain head)
//!     → primary = first ranked, secondary = first ranked != primary
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless; the registry tracks health
//! - Ties keep input order (stable sort)
//! - Banned and failing endpoints are ranked last, never dropped: selection
//!   always yields an endpoint

use std::time::Duration;

use crate::health::EndpointStats;

pub mod block_height;
pub mod lowest_latency;

pub use block_height::FreshestLowestLatency;
pub use lowest_latency::LowestLatency;

/// Read-only view handed to a strategy. Never empty.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    endpoints: &'a [EndpointStats],
}

impl<'a> SelectionContext<'a> {
    /// Returns `None` for an empty endpoint set.
    pub fn new(endpoints: &'a [EndpointStats]) -> Option<Self> {
        if endpoints.is_empty() {
            None
        } else {
            Some(Self { endpoints })
        }
    }

    pub fn endpoints(&self) -> &'a [EndpointStats] {
        self.endpoints
    }

    /// First configured endpoint; used when a strategy ranks nothing.
    pub fn fallback(&self) -> &'a str {
        &self.endpoints[0].endpoint
    }
}

/// Picks primary and secondary endpoints from a registry snapshot.
pub trait SelectionStrategy: Send + Sync {
    /// Order endpoints best first.
    fn rank<'a>(&self, ctx: &SelectionContext<'a>) -> Vec<&'a EndpointStats>;

    fn select_primary(&self, ctx: &SelectionContext<'_>) -> String {
        self.rank(ctx)
            .first()
            .map(|s| s.endpoint.clone())
            .unwrap_or_else(|| ctx.fallback().to_string())
    }

    fn select_secondary(&self, ctx: &SelectionContext<'_>, primary: &str) -> String {
        self.rank(ctx)
            .into_iter()
            .find(|s| s.endpoint != primary)
            .map(|s| s.endpoint.clone())
            .unwrap_or_else(|| primary.to_string())
    }
}

/// Rank endpoints into tiers, each ordered by latency then input order:
/// fresh and healthy, healthy but not fresh, not healthy, banned.
pub fn rank_endpoints<'a, F>(endpoints: &'a [EndpointStats], is_fresh: F) -> Vec<&'a EndpointStats>
where
    F: Fn(&EndpointStats) -> bool,
{
    let mut ranked: Vec<&EndpointStats> = endpoints.iter().collect();
    ranked.sort_by_key(|s| rank_key(s, &is_fresh));
    ranked
}

fn rank_key<F>(stats: &EndpointStats, is_fresh: &F) -> (u8, Duration)
where
    F: Fn(&EndpointStats) -> bool,
{
    if stats.banned {
        return (3, Duration::ZERO);
    }
    match stats.healthy_latency() {
        Some(latency) if is_fresh(stats) => (0, latency),
        Some(latency) => (1, latency),
        None => (2, Duration::ZERO),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_empty_context() {
        assert!(SelectionContext::new(&[]).is_none());
    }

    #[test]
    fn test_tiers_keep_input_order() {
        let stats = vec![
            banned("a"),
            unchecked("b"),
            failing("c"),
            healthy("d", 90, None),
            healthy("e", 90, None),
            healthy("f", 10, None),
        ];
        let ranked: Vec<&str> = rank_endpoints(&stats, |_| true)
            .iter()
            .map(|s| s.endpoint.as_str())
            .collect();
        assert_eq!(ranked, vec!["f", "d", "e", "b", "c", "a"]);
    }
}
