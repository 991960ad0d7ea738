//! Observability snapshot: a point-in-time read of every component's
//! counters, assembled without touching any hot-path state (§6.5, §7).

use crate::execution::ExecutionLayer;
use feed::{FeedHandler, FeedStats};
use rand::Rng;
use reconciliation::PositionReconciliationManager;

/// A consistent-enough read of feed, risk, OMS, and position state for a
/// dashboard or a log line. Not atomic across fields: the caller accepts a
/// small window of skew in exchange for not locking anything to take it.
#[derive(Debug, Clone, Copy)]
pub struct EngineSnapshot {
    pub feed_stats: FeedStats,
    pub total_net_position: i64,
    pub daily_realized_pnl: i64,
    pub any_breaker_active: bool,
    pub emergency_active: bool,
    pub rejected_order_count: u64,
    pub audit_entry_count: u64,
    pub triggered_break_count: u64,
    pub resolved_break_count: u64,
    pub position_history_count: u64,
}

impl EngineSnapshot {
    #[must_use]
    pub fn capture<R: Rng>(feed: &FeedHandler, execution: &ExecutionLayer<R>, position: &PositionReconciliationManager) -> Self {
        Self {
            feed_stats: feed.stats(),
            total_net_position: execution.risk().total_net_position(),
            daily_realized_pnl: execution.risk().daily_realized_pnl(),
            any_breaker_active: execution.risk().any_breaker_active(),
            emergency_active: execution.risk().is_emergency_active() || execution.olm().is_emergency_active(),
            rejected_order_count: execution.olm().rejected_count(),
            audit_entry_count: execution.olm().audit_entry_count(),
            triggered_break_count: position.triggered_break_count(),
            resolved_break_count: position.resolved_break_count(),
            position_history_count: position.history_count(),
        }
    }
}
