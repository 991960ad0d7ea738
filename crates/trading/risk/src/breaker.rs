//! One circuit breaker per rule class (§4.7). Each is cache-line aligned and
//! latches on trip; it stays active until [`CircuitBreaker::reset`].

use common::Ts;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CircuitBreakerType {
    PositionLimit = 0,
    PnlLoss = 1,
    OrderRate = 2,
    Volatility = 3,
    Concentration = 4,
    Drawdown = 5,
    Var = 6,
    Leverage = 7,
}

pub const NUM_BREAKER_TYPES: usize = 8;

impl CircuitBreakerType {
    pub const ALL: [Self; NUM_BREAKER_TYPES] = [
        Self::PositionLimit,
        Self::PnlLoss,
        Self::OrderRate,
        Self::Volatility,
        Self::Concentration,
        Self::Drawdown,
        Self::Var,
        Self::Leverage,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Severity of a breach or comprehensive check result (§4.7). Ordered
/// `Approved < Warning < PositionReduce < TradeRejected < EmergencyHalt` so
/// composing two results is `a.max(b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Approved = 0,
    Warning = 1,
    PositionReduce = 2,
    TradeRejected = 3,
    EmergencyHalt = 4,
}

/// One breaker's live state. Bookkeeping fields (trip count, active flag)
/// are atomics so an external supervisor can poll them without touching the
/// execution thread's exclusive borrow of [`crate::RiskController`].
#[repr(C, align(64))]
pub struct CircuitBreaker {
    pub breaker_type: CircuitBreakerType,
    pub severity: Severity,
    threshold_bits: AtomicU64,
    current_value_bits: AtomicU64,
    trigger_ts_ns: AtomicU64,
    trigger_count: AtomicU64,
    active: AtomicBool,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(breaker_type: CircuitBreakerType, severity: Severity, threshold: f64) -> Self {
        Self {
            breaker_type,
            severity,
            threshold_bits: AtomicU64::new(threshold.to_bits()),
            current_value_bits: AtomicU64::new(0),
            trigger_ts_ns: AtomicU64::new(0),
            trigger_count: AtomicU64::new(0),
            active: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        f64::from_bits(self.threshold_bits.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn current_value(&self) -> f64 {
        f64::from_bits(self.current_value_bits.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn trigger_count(&self) -> u64 {
        self.trigger_count.load(Ordering::Relaxed)
    }

    /// Record the latest observed value. Trips the breaker (latched) the
    /// first time `value.abs() > threshold`; does not auto-clear.
    pub fn observe(&self, value: f64, now_ns: u64) -> bool {
        self.current_value_bits.store(value.to_bits(), Ordering::Relaxed);
        if value.abs() > self.threshold() && !self.active.swap(true, Ordering::AcqRel) {
            self.trigger_ts_ns.store(now_ns, Ordering::Relaxed);
            self.trigger_count.fetch_add(1, Ordering::Relaxed);
        }
        self.active.load(Ordering::Acquire)
    }

    /// Clear the latched flag. Returns the timestamp at which it was reset.
    pub fn reset(&self, now_ns: u64) {
        self.active.store(false, Ordering::Release);
        self.trigger_ts_ns.store(now_ns, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            breaker_type: self.breaker_type,
            severity: self.severity,
            threshold: self.threshold(),
            current_value: self.current_value(),
            trigger_ts: Ts::from_nanos(self.trigger_ts_ns.load(Ordering::Relaxed)),
            trigger_count: self.trigger_count(),
            active: self.is_active(),
        }
    }
}

/// Read-only point-in-time view of a breaker, for the observability surface.
#[derive(Debug, Clone, Copy)]
pub struct BreakerSnapshot {
    pub breaker_type: CircuitBreakerType,
    pub severity: Severity,
    pub threshold: f64,
    pub current_value: f64,
    pub trigger_ts: Ts,
    pub trigger_count: u64,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_trips_and_latches() {
        let b = CircuitBreaker::new(CircuitBreakerType::PnlLoss, Severity::EmergencyHalt, 100.0);
        assert!(!b.observe(50.0, 1));
        assert!(b.observe(150.0, 2));
        assert!(b.observe(10.0, 3), "stays latched until reset");
    }

    #[test]
    fn reset_clears_active() {
        let b = CircuitBreaker::new(CircuitBreakerType::OrderRate, Severity::TradeRejected, 10.0);
        b.observe(20.0, 1);
        assert!(b.is_active());
        b.reset(2);
        assert!(!b.is_active());
    }

    #[test]
    fn severity_ordering_matches_spec() {
        assert!(Severity::Approved < Severity::Warning);
        assert!(Severity::Warning < Severity::PositionReduce);
        assert!(Severity::PositionReduce < Severity::TradeRejected);
        assert!(Severity::TradeRejected < Severity::EmergencyHalt);
    }
}
