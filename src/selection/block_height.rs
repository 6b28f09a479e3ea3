//! Block-height aware selection for RPC nodes.
//!
//! A node that answers fast but trails the chain head is worse than a slower
//! node that is in sync, so endpoints lagging the best observed height by more
//! than `max_block_lag` are ranked after every in-sync endpoint.

use crate::health::EndpointStats;
use crate::selection::{rank_endpoints, SelectionContext, SelectionStrategy};

#[derive(Debug, Clone, Copy)]
pub struct FreshestLowestLatency {
    max_block_lag: u64,
}

impl FreshestLowestLatency {
    pub fn new(max_block_lag: u64) -> Self {
        Self { max_block_lag }
    }
}

impl SelectionStrategy for FreshestLowestLatency {
    fn rank<'a>(&self, ctx: &SelectionContext<'a>) -> Vec<&'a EndpointStats> {
        let head = ctx
            .endpoints()
            .iter()
            .filter(|s| !s.banned)
            .filter_map(EndpointStats::block_number)
            .max();

        rank_endpoints(ctx.endpoints(), |s| match (head, s.block_number()) {
            (Some(head), Some(height)) => head.saturating_sub(height) <= self.max_block_lag,
            // Probes that report no height cannot be judged stale.
            _ => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::test_support::*;

    #[test]
    fn test_lagging_node_demoted() {
        let stats = vec![
            healthy("slow-synced", 120, Some(1_000)),
            healthy("fast-stale", 20, Some(980)),
            healthy("mid-synced", 60, Some(997)),
        ];
        let ctx = SelectionContext::new(&stats).unwrap();
        let lb = FreshestLowestLatency::new(5);

        let ranked: Vec<&str> = lb.rank(&ctx).iter().map(|s| s.endpoint.as_str()).collect();
        assert_eq!(ranked, vec!["mid-synced", "slow-synced", "fast-stale"]);
    }

    #[test]
    fn test_stale_but_healthy_beats_failing() {
        let stats = vec![failing("down"), healthy("stale", 20, Some(10)), healthy("head", 50, Some(100))];
        let ctx = SelectionContext::new(&stats).unwrap();
        let lb = FreshestLowestLatency::new(5);

        assert_eq!(lb.select_primary(&ctx), "head");
        assert_eq!(lb.select_secondary(&ctx, "head"), "stale");
    }

    #[test]
    fn test_banned_head_does_not_count() {
        let mut ahead = healthy("banned-ahead", 5, Some(5_000));
        ahead.banned = true;
        let stats = vec![ahead, healthy("a", 30, Some(100)), healthy("b", 10, Some(99))];
        let ctx = SelectionContext::new(&stats).unwrap();

        assert_eq!(FreshestLowestLatency::new(5).select_primary(&ctx), "b");
    }
}
