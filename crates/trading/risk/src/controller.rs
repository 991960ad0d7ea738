//! C7: the two-layer risk gate (§4.7) — Layer 1 hard limits (always run),
//! Layer 2 enhanced checks (opt-in per request), circuit breakers, and the
//! global emergency-stop flag.

use crate::breaker::{CircuitBreaker, CircuitBreakerType, Severity};
use crate::limits::{EnhancedLimits, RiskLimits, VolatilityLimits};
use crate::rate::RateCounter;
use crate::volatility::VolatilityTracker;
use common::{NUM_INSTRUMENTS, Side, TreasuryType};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Enhanced (Layer 2) portfolio metrics, refreshed by
/// [`RiskController::update_layer2_state`]. Plain fields: owned exclusively
/// by the single execution thread that drives this controller.
#[derive(Debug, Clone, Copy, Default)]
struct Layer2State {
    portfolio_dv01: f64,
    concentration_ratio: f64,
    correlation_exposure: f64,
    value_at_risk: f64,
    stress_test_loss: f64,
}

/// Two-layer real-time risk control (§4.7). Pre-trade checks never suspend;
/// every method returns immediately. Instrument position deltas, total
/// position, daily P&L, and the emergency flag are atomics: the only
/// cross-thread state this component exposes (§5).
pub struct RiskController {
    limits: RiskLimits,
    enhanced: EnhancedLimits,
    volatility_limits: VolatilityLimits,

    instrument_net_position: [AtomicI64; NUM_INSTRUMENTS],
    total_net_position: AtomicI64,
    daily_realized_pnl: AtomicI64,

    orders_per_second: RateCounter,
    messages_per_second: RateCounter,

    volatility: [VolatilityTracker; NUM_INSTRUMENTS],
    layer2: Layer2State,

    breakers: [CircuitBreaker; 8],
    emergency_stop: AtomicBool,
}

impl RiskController {
    #[must_use]
    pub fn new(limits: RiskLimits, enhanced: EnhancedLimits, volatility_limits: VolatilityLimits) -> Self {
        Self {
            limits,
            enhanced,
            volatility_limits,
            instrument_net_position: std::array::from_fn(|_| AtomicI64::new(0)),
            total_net_position: AtomicI64::new(0),
            daily_realized_pnl: AtomicI64::new(0),
            orders_per_second: RateCounter::new(),
            messages_per_second: RateCounter::new(),
            volatility: std::array::from_fn(|_| VolatilityTracker::new()),
            layer2: Layer2State::default(),
            breakers: [
                CircuitBreaker::new(CircuitBreakerType::PositionLimit, Severity::TradeRejected, limits.max_position_per_instrument as f64),
                CircuitBreaker::new(CircuitBreakerType::PnlLoss, Severity::EmergencyHalt, limits.max_daily_loss as f64),
                CircuitBreaker::new(CircuitBreakerType::OrderRate, Severity::TradeRejected, limits.max_orders_per_second as f64),
                CircuitBreaker::new(CircuitBreakerType::Volatility, Severity::Warning, volatility_limits.max_price_volatility),
                CircuitBreaker::new(CircuitBreakerType::Concentration, Severity::Warning, enhanced.concentration_limit),
                CircuitBreaker::new(CircuitBreakerType::Drawdown, Severity::EmergencyHalt, enhanced.stress_loss_limit),
                CircuitBreaker::new(CircuitBreakerType::Var, Severity::PositionReduce, enhanced.var_limit),
                CircuitBreaker::new(CircuitBreakerType::Leverage, Severity::PositionReduce, enhanced.dv01_limit),
            ],
            emergency_stop: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_emergency_active(&self) -> bool {
        self.emergency_stop.load(Ordering::Acquire)
    }

    pub fn activate_emergency_halt(&self) {
        self.emergency_stop.store(true, Ordering::Release);
    }

    /// Clears the global flag. Per §7, callers must also reset the
    /// originating breakers for the system to resume admitting orders.
    pub fn deactivate_emergency_halt(&self) {
        self.emergency_stop.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn breaker(&self, breaker_type: CircuitBreakerType) -> &CircuitBreaker {
        &self.breakers[breaker_type.index()]
    }

    pub fn reset_breaker(&self, breaker_type: CircuitBreakerType, now_ns: u64) {
        self.breakers[breaker_type.index()].reset(now_ns);
    }

    /// True iff any breaker is currently latched active.
    #[must_use]
    pub fn any_breaker_active(&self) -> bool {
        self.breakers.iter().any(CircuitBreaker::is_active)
    }

    /// Layer 1 hard-limit gate (§4.7 table; budget <= 50 ns). Read-only with
    /// respect to state: does not commit the proposed trade. Callers commit
    /// via [`Self::update_layer1_state`] after the order is accepted
    /// downstream.
    pub fn check_layer1(&self, instrument: TreasuryType, side: Side, qty: u64, now_ns: u64) -> Severity {
        if self.is_emergency_active() {
            return Severity::EmergencyHalt;
        }

        let delta = match side {
            Side::Bid => qty as i64,
            Side::Ask => -(qty as i64),
        };

        let idx = instrument.index();
        let proposed_instrument = self.instrument_net_position[idx].load(Ordering::Relaxed) + delta;
        if proposed_instrument.unsigned_abs() as i64 > self.limits.max_position_per_instrument {
            self.breaker(CircuitBreakerType::PositionLimit).observe(proposed_instrument as f64, now_ns);
            return Severity::TradeRejected;
        }

        let proposed_total = self.total_net_position.load(Ordering::Relaxed) + delta;
        if proposed_total.unsigned_abs() as i64 > self.limits.max_total_position {
            self.breaker(CircuitBreakerType::PositionLimit).observe(proposed_total as f64, now_ns);
            return Severity::TradeRejected;
        }

        let pnl = self.daily_realized_pnl.load(Ordering::Relaxed);
        if pnl < -self.limits.max_daily_loss {
            self.breaker(CircuitBreakerType::PnlLoss).observe(pnl as f64, now_ns);
            self.activate_emergency_halt();
            return Severity::EmergencyHalt;
        }

        if qty > self.limits.max_order_size {
            return Severity::TradeRejected;
        }

        let mut orders_counter = self.orders_per_second.clone();
        if orders_counter.current(now_ns) >= self.limits.max_orders_per_second {
            self.breaker(CircuitBreakerType::OrderRate).observe(self.limits.max_orders_per_second as f64 + 1.0, now_ns);
            return Severity::TradeRejected;
        }

        let mut messages_counter = self.messages_per_second.clone();
        if messages_counter.current(now_ns) >= self.limits.max_messages_per_second {
            return Severity::TradeRejected;
        }

        Severity::Approved
    }

    /// Commit a trade's effect on Layer 1 state: position deltas, realized
    /// P&L, and the per-second order counter (§4.7).
    pub fn update_layer1_state(&mut self, instrument: TreasuryType, qty_delta: i64, realized_pnl_delta: i64, now_ns: u64) {
        self.instrument_net_position[instrument.index()].fetch_add(qty_delta, Ordering::AcqRel);
        self.total_net_position.fetch_add(qty_delta, Ordering::AcqRel);
        self.daily_realized_pnl.fetch_add(realized_pnl_delta, Ordering::AcqRel);
        self.orders_per_second.record(now_ns);
    }

    /// Record one inbound market-data message against the per-second
    /// message-rate limit.
    pub fn record_message(&mut self, now_ns: u64) {
        self.messages_per_second.record(now_ns);
    }

    /// Layer 2 enhanced checks (§4.7 table; budget <= 400 ns). Evaluated
    /// only when the caller opts in (`use_enhanced`); independent of Layer 1.
    pub fn check_layer2(&self, now_ns: u64) -> Severity {
        let mut worst = Severity::Approved;

        if self.layer2.portfolio_dv01.abs() > self.enhanced.dv01_limit {
            self.breaker(CircuitBreakerType::Leverage).observe(self.layer2.portfolio_dv01, now_ns);
            worst = worst.max(Severity::PositionReduce);
        }
        if self.layer2.concentration_ratio > self.enhanced.concentration_limit {
            self.breaker(CircuitBreakerType::Concentration).observe(self.layer2.concentration_ratio, now_ns);
            worst = worst.max(Severity::Warning);
        }
        if self.layer2.correlation_exposure > self.enhanced.correlation_limit {
            worst = worst.max(Severity::Warning);
        }
        if self.layer2.value_at_risk.abs() > self.enhanced.var_limit {
            self.breaker(CircuitBreakerType::Var).observe(self.layer2.value_at_risk, now_ns);
            worst = worst.max(Severity::PositionReduce);
        }
        if self.layer2.stress_test_loss.abs() > self.enhanced.stress_loss_limit {
            self.breaker(CircuitBreakerType::Drawdown).observe(self.layer2.stress_test_loss, now_ns);
            worst = worst.max(Severity::EmergencyHalt);
        }

        if worst == Severity::EmergencyHalt {
            self.activate_emergency_halt();
        }
        worst
    }

    /// Refresh the Layer 2 portfolio metrics the next [`Self::check_layer2`]
    /// call will evaluate against.
    pub fn update_layer2_state(&mut self, dv01: f64, concentration: f64, correlation: f64, var: f64, stress_loss: f64) {
        self.layer2 = Layer2State {
            portfolio_dv01: dv01,
            concentration_ratio: concentration,
            correlation_exposure: correlation,
            value_at_risk: var,
            stress_test_loss: stress_loss,
        };
    }

    /// The comprehensive check: Layer 1 always runs; Layer 2 runs only if
    /// `use_enhanced`. Result is the more restrictive of the two (§4.7).
    pub fn check_comprehensive(&self, instrument: TreasuryType, side: Side, qty: u64, use_enhanced: bool, now_ns: u64) -> Severity {
        let layer1 = self.check_layer1(instrument, side, qty, now_ns);
        if !use_enhanced || layer1 == Severity::EmergencyHalt {
            return layer1;
        }
        layer1.max(self.check_layer2(now_ns))
    }

    /// Feed one market mid-price observation into the per-instrument
    /// volatility tracker and the `Volatility` breaker.
    pub fn update_market_price(&mut self, instrument: TreasuryType, mid_price: f64, now_ns: u64) {
        let tracker = &mut self.volatility[instrument.index()];
        tracker.push(mid_price);
        let vol = tracker.returns_std_dev();
        self.breaker(CircuitBreakerType::Volatility).observe(vol, now_ns);
    }

    #[must_use]
    pub fn instrument_net_position(&self, instrument: TreasuryType) -> i64 {
        self.instrument_net_position[instrument.index()].load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_net_position(&self) -> i64 {
        self.total_net_position.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn daily_realized_pnl(&self) -> i64 {
        self.daily_realized_pnl.load(Ordering::Relaxed)
    }

    /// Zero all position/P&L state and clear every breaker. Does not touch
    /// the emergency-stop flag; that requires an explicit
    /// [`Self::deactivate_emergency_halt`] call.
    pub fn reset_daily(&mut self, now_ns: u64) {
        for p in &self.instrument_net_position {
            p.store(0, Ordering::Relaxed);
        }
        self.total_net_position.store(0, Ordering::Relaxed);
        self.daily_realized_pnl.store(0, Ordering::Relaxed);
        for b in &self.breakers {
            b.reset(now_ns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RiskController {
        RiskController::new(RiskLimits::default(), EnhancedLimits::default(), VolatilityLimits::default())
    }

    #[test]
    fn accepts_exactly_at_position_limit() {
        let mut c = controller();
        let limit = c.limits.max_position_per_instrument;
        c.update_layer1_state(TreasuryType::Note10Y, limit, 0, 0);
        let result = c.check_layer1(TreasuryType::Note10Y, Side::Bid, 0, 1);
        assert_eq!(result, Severity::Approved);
    }

    #[test]
    fn rejects_one_over_position_limit() {
        let mut c = controller();
        let limit = c.limits.max_position_per_instrument;
        c.update_layer1_state(TreasuryType::Note10Y, limit - 1, 0, 0);
        let result = c.check_layer1(TreasuryType::Note10Y, Side::Bid, 2, 1);
        assert_eq!(result, Severity::TradeRejected);
    }

    #[test]
    fn scenario_5_hard_limit_rejects_overage() {
        // §8.3 scenario 5
        let mut c = controller();
        c.update_layer1_state(TreasuryType::Note10Y, 95_000_000, 0, 0);
        let result = c.check_layer1(TreasuryType::Note10Y, Side::Bid, 10_000_000, 1);
        assert_eq!(result, Severity::TradeRejected);
    }

    #[test]
    fn emergency_halt_overrides_every_check() {
        let c = controller();
        c.activate_emergency_halt();
        for _ in 0..3 {
            assert_eq!(c.check_layer1(TreasuryType::Bill3M, Side::Bid, 1, 1), Severity::EmergencyHalt);
        }
    }

    #[test]
    fn daily_loss_breach_triggers_emergency_halt() {
        let mut c = controller();
        let loss = -(c.limits.max_daily_loss + 1);
        c.update_layer1_state(TreasuryType::Bill3M, 0, loss, 1);
        assert_eq!(c.check_layer1(TreasuryType::Bill3M, Side::Bid, 1, 2), Severity::EmergencyHalt);
        assert!(c.is_emergency_active());
    }

    #[test]
    fn order_rate_limit_rejects_once_exceeded() {
        let mut limits = RiskLimits::default();
        limits.max_orders_per_second = 2;
        let mut c = RiskController::new(limits, EnhancedLimits::default(), VolatilityLimits::default());
        c.update_layer1_state(TreasuryType::Bill3M, 0, 0, 0);
        c.update_layer1_state(TreasuryType::Bill3M, 0, 0, 0);
        assert_eq!(c.check_layer1(TreasuryType::Bill3M, Side::Bid, 1, 0), Severity::TradeRejected);
    }

    #[test]
    fn comprehensive_takes_most_restrictive_layer() {
        let mut c = controller();
        c.update_layer2_state(100_000.0, 0.1, 0.1, 0.0, 0.0);
        let result = c.check_comprehensive(TreasuryType::Bill3M, Side::Bid, 1, true, 1);
        assert_eq!(result, Severity::PositionReduce);
    }

    #[test]
    fn reset_daily_clears_positions_and_breakers() {
        let mut c = controller();
        c.update_layer1_state(TreasuryType::Bill3M, 1000, 0, 0);
        c.breaker(CircuitBreakerType::OrderRate).observe(9999.0, 0);
        c.reset_daily(1);
        assert_eq!(c.total_net_position(), 0);
        assert!(!c.any_breaker_active());
    }
}
