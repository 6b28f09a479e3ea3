//! Lowest latency selection strategy.

use crate::health::EndpointStats;
use crate::selection::{rank_endpoints, SelectionContext, SelectionStrategy};

/// Lowest latency selector.
/// Ranks healthy endpoints by the latency of their last successful check.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowestLatency;

impl LowestLatency {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for LowestLatency {
    fn rank<'a>(&self, ctx: &SelectionContext<'a>) -> Vec<&'a EndpointStats> {
        rank_endpoints(ctx.endpoints(), |_| true)
    }
}
