//! C8: the order lifecycle manager. Owns every order's slot, state machine,
//! audit trail, and venue routing decision (§4.8).

use crate::error::OrderError;
use crate::record::{AuditEntry, OrderRecord};
use crate::state::{OrderState, TimeInForce};
use crate::venue_score::VenueScorer;
use common::{OrderType, Price32nd, Side, TreasuryType, Ts};
use risk::{RiskController, Severity};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// §6.5 OLM tunables.
#[derive(Debug, Clone, Copy)]
pub struct OlmConfig {
    pub max_orders: usize,
    pub audit_trail_size: usize,
    pub max_venues: usize,
}

impl Default for OlmConfig {
    fn default() -> Self {
        Self {
            max_orders: 65_536,
            audit_trail_size: 1_048_576,
            max_venues: 8,
        }
    }
}

/// Owns every `OrderRecord`'s slot, transitions it through the state
/// machine, appends audit entries, and scores venues for routing.
///
/// The slot table is a `Vec`, not a `[OrderRecord; N]` const-generic array,
/// so tests can construct small tables; the claim/probe/CAS discipline
/// (§4.8) is identical regardless of capacity.
pub struct OrderLifecycleManager {
    config: OlmConfig,
    slots: Vec<OrderRecord>,
    used: Vec<AtomicBool>,
    next_order_id: AtomicU64,
    audit_trail: Vec<AuditEntry>,
    next_audit_id: u64,
    venue_scorer: VenueScorer,
    emergency_stop: AtomicBool,
    rejected_count: u64,
}

impl OrderLifecycleManager {
    #[must_use]
    pub fn new(config: OlmConfig) -> Self {
        let placeholder = OrderRecord::new(
            0,
            0,
            Ts::from_nanos(0),
            TreasuryType::Bill3M,
            OrderType::Invalid,
            Side::Bid,
            Price32nd::default(),
            0.0,
            0,
            TimeInForce::Day,
        );
        Self {
            slots: vec![placeholder; config.max_orders],
            used: (0..config.max_orders).map(|_| AtomicBool::new(false)).collect(),
            next_order_id: AtomicU64::new(1),
            audit_trail: vec![
                AuditEntry::new(0, 0, Ts::from_nanos(0), OrderState::Created, OrderState::Created, Price32nd::default(), 0, "");
                config.audit_trail_size
            ],
            next_audit_id: 0,
            venue_scorer: VenueScorer::new(config.max_venues),
            emergency_stop: AtomicBool::new(false),
            rejected_count: 0,
            config,
        }
    }

    #[must_use]
    pub fn is_emergency_active(&self) -> bool {
        self.emergency_stop.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    #[must_use]
    pub fn venue_scorer_mut(&mut self) -> &mut VenueScorer {
        &mut self.venue_scorer
    }

    fn slot_index(&self, order_id: u64) -> usize {
        (order_id as usize) % self.config.max_orders
    }

    fn find_slot(&self, order_id: u64) -> Option<usize> {
        let idx = self.slot_index(order_id);
        if self.used[idx].load(Ordering::Acquire) && self.slots[idx].order_id == order_id {
            Some(idx)
        } else {
            None
        }
    }

    #[must_use]
    pub fn get_order(&self, order_id: u64) -> Option<OrderRecord> {
        self.find_slot(order_id).map(|idx| self.slots[idx])
    }

    fn push_audit(&mut self, order_id: u64, ts: Ts, old: OrderState, new: OrderState, price: Price32nd, qty: u64, reason: &str) {
        let entry_id = self.next_audit_id;
        self.next_audit_id += 1;
        let idx = (entry_id as usize) % self.audit_trail.len();
        self.audit_trail[idx] = AuditEntry::new(entry_id, order_id, ts, old, new, price, qty, reason);
    }

    #[must_use]
    pub fn audit_entry_count(&self) -> u64 {
        self.next_audit_id
    }

    #[must_use]
    pub fn audit_entry(&self, entry_id: u64) -> Option<AuditEntry> {
        if entry_id >= self.next_audit_id || self.next_audit_id - entry_id > self.audit_trail.len() as u64 {
            return None;
        }
        Some(self.audit_trail[(entry_id as usize) % self.audit_trail.len()])
    }

    fn release(&self, idx: usize) {
        self.used[idx].store(false, Ordering::Release);
    }

    fn transition(&mut self, idx: usize, allowed: &[OrderState], new_state: OrderState, ts: Ts, reason: &str) -> bool {
        let old_state = self.slots[idx].state;
        if !allowed.contains(&old_state) {
            return false;
        }
        self.slots[idx].state = new_state;
        let order_id = self.slots[idx].order_id;
        let price = self.slots[idx].limit_price;
        let qty = self.slots[idx].qty;
        self.push_audit(order_id, ts, old_state, new_state, price, qty, reason);
        if new_state.is_terminal() {
            self.release(idx);
        }
        true
    }

    /// Validate the instrument-specific quantity rule and positive
    /// price/quantity (§4.8 "Validation rules per instrument").
    fn validate_new_order(instrument: TreasuryType, order_type: OrderType, limit_price: Price32nd, yield_limit: f64, qty: u64) -> Result<(), OrderError> {
        if qty == 0 {
            return Err(OrderError::InvalidValue);
        }
        let (min_qty, increment) = instrument.quantity_rule();
        if qty < min_qty || qty % increment != 0 {
            return Err(OrderError::InvalidQuantity);
        }
        match order_type {
            OrderType::Limit if limit_price.whole == 0 && limit_price.thirty_seconds == 0 && limit_price.half_32nds == 0 => {
                Err(OrderError::InvalidValue)
            }
            OrderType::YieldLimit if yield_limit <= 0.0 => Err(OrderError::InvalidValue),
            OrderType::Invalid => Err(OrderError::InvalidValue),
            _ => Ok(()),
        }
    }

    /// Create a new order. Returns `0` on any rejection (capacity, risk
    /// gate, breaker, validation, or emergency stop) — the caller inspects
    /// the audit trail for why (§6.2, §7).
    #[allow(clippy::too_many_arguments)]
    pub fn create_order(
        &mut self,
        risk: &RiskController,
        instrument: TreasuryType,
        side: Side,
        order_type: OrderType,
        limit_price: Price32nd,
        yield_limit: f64,
        qty: u64,
        tif: TimeInForce,
        now_ns: u64,
    ) -> u64 {
        if self.is_emergency_active() || risk.any_breaker_active() {
            self.rejected_count += 1;
            return 0;
        }

        if Self::validate_new_order(instrument, order_type, limit_price, yield_limit, qty).is_err() {
            self.rejected_count += 1;
            return 0;
        }

        if risk.check_layer1(instrument, side, qty, now_ns) != Severity::Approved {
            self.rejected_count += 1;
            return 0;
        }

        let start_id = self.next_order_id.fetch_add(1, Ordering::AcqRel);
        let mut claimed = None;
        for probe in 0..self.config.max_orders as u64 {
            let candidate = start_id.wrapping_add(probe).max(1);
            let idx = self.slot_index(candidate);
            if self.used[idx].compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                claimed = Some((idx, candidate));
                break;
            }
        }

        let Some((idx, order_id)) = claimed else {
            self.rejected_count += 1;
            return 0;
        };

        let ts = Ts::from_nanos(now_ns);
        self.slots[idx] = OrderRecord::new(order_id, order_id, ts, instrument, order_type, side, limit_price, yield_limit, qty, tif);
        self.push_audit(order_id, ts, OrderState::Created, OrderState::Created, limit_price, qty, "created");
        self.transition(idx, &[OrderState::Created], OrderState::Validated, ts, "validated");
        order_id
    }

    /// Score enabled venues and route. Returns the chosen venue index.
    pub fn route_order(&mut self, order_id: u64, now_ns: u64) -> Option<u32> {
        let idx = self.find_slot(order_id)?;
        if self.slots[idx].state != OrderState::Validated {
            return None;
        }
        let venue = self.venue_scorer.best_venue()?;
        self.slots[idx].target_venue = venue;
        self.transition(idx, &[OrderState::Validated], OrderState::Routed, Ts::from_nanos(now_ns), "routed");
        Some(venue)
    }

    pub fn mark_pending_new(&mut self, order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        self.transition(idx, &[OrderState::Routed], OrderState::PendingNew, Ts::from_nanos(now_ns), "pending_new")
    }

    pub fn apply_ack(&mut self, order_id: u64, venue_order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        let ts = Ts::from_nanos(now_ns);
        let ok = self.transition(idx, &[OrderState::PendingNew], OrderState::Acknowledged, ts, "acknowledged");
        if ok {
            self.slots[idx].venue_order_id = venue_order_id;
            self.slots[idx].ts_venue = ts;
        }
        ok
    }

    /// Apply a fill report (§4.8 "Fill application"). Updates the venue's
    /// EMA fill-rate/latency stats via the order's routed venue.
    pub fn process_fill(&mut self, order_id: u64, executed_qty: u64, fill_price: Price32nd, observed_latency_ns: f64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        if !matches!(self.slots[idx].state, OrderState::Acknowledged | OrderState::PartiallyFilled) {
            return false;
        }

        self.slots[idx].filled_qty = (self.slots[idx].filled_qty + executed_qty).min(self.slots[idx].qty);
        self.slots[idx].remaining_qty = self.slots[idx].qty - self.slots[idx].filled_qty;
        let new_state = if self.slots[idx].remaining_qty == 0 {
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };

        let ts = Ts::from_nanos(now_ns);
        let old_state = self.slots[idx].state;
        self.slots[idx].state = new_state;
        self.push_audit(order_id, ts, old_state, new_state, fill_price, executed_qty, "fill");
        if new_state.is_terminal() {
            self.release(idx);
        }

        let venue = self.slots[idx].target_venue as usize;
        self.venue_scorer.observe_fill(venue, true, observed_latency_ns);
        true
    }

    /// Rewrite price/quantity and move the order into `PendingReplace`
    /// (§4.8 "Modify").
    pub fn modify_order(&mut self, order_id: u64, new_price: Price32nd, new_qty: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        if !matches!(self.slots[idx].state, OrderState::Acknowledged | OrderState::PartiallyFilled) {
            return false;
        }
        self.slots[idx].limit_price = new_price;
        self.slots[idx].qty = new_qty;
        self.slots[idx].filled_qty = self.slots[idx].filled_qty.min(new_qty);
        self.slots[idx].remaining_qty = new_qty - self.slots[idx].filled_qty;
        self.transition(idx, &[OrderState::Acknowledged, OrderState::PartiallyFilled], OrderState::PendingReplace, Ts::from_nanos(now_ns), "modify")
    }

    pub fn complete_replace(&mut self, order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        self.transition(idx, &[OrderState::PendingReplace], OrderState::Replaced, Ts::from_nanos(now_ns), "replaced")
    }

    pub fn request_cancel(&mut self, order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        self.transition(idx, &[OrderState::Acknowledged, OrderState::PartiallyFilled], OrderState::PendingCancel, Ts::from_nanos(now_ns), "cancel_requested")
    }

    pub fn apply_cancel(&mut self, order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        self.transition(idx, &[OrderState::PendingCancel], OrderState::Cancelled, Ts::from_nanos(now_ns), "cancelled")
    }

    pub fn reject_order(&mut self, order_id: u64, reason: &str, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        let old_state = self.slots[idx].state;
        if old_state.is_terminal() {
            return false;
        }
        self.transition(idx, &[old_state], OrderState::Rejected, Ts::from_nanos(now_ns), reason)
    }

    pub fn expire_order(&mut self, order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        let old_state = self.slots[idx].state;
        if old_state.is_terminal() {
            return false;
        }
        self.transition(idx, &[old_state], OrderState::Expired, Ts::from_nanos(now_ns), "expired")
    }

    pub fn suspend_order(&mut self, order_id: u64, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        let old_state = self.slots[idx].state;
        if old_state.is_terminal() {
            return false;
        }
        self.transition(idx, &[old_state], OrderState::Suspended, Ts::from_nanos(now_ns), "suspended")
    }

    pub fn resume_order(&mut self, order_id: u64, resumed_state: OrderState, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        self.transition(idx, &[OrderState::Suspended], resumed_state, Ts::from_nanos(now_ns), "resumed")
    }

    pub fn mark_error(&mut self, order_id: u64, reason: &str, now_ns: u64) -> bool {
        let Some(idx) = self.find_slot(order_id) else { return false };
        let old_state = self.slots[idx].state;
        if old_state.is_terminal() {
            return false;
        }
        self.transition(idx, &[old_state], OrderState::Error, Ts::from_nanos(now_ns), reason)
    }

    /// Force every non-terminal order to `Cancelled` and latch the global
    /// emergency flag; subsequent `create_order` calls return 0 (§4.8).
    pub fn emergency_stop_all(&mut self, now_ns: u64) {
        self.emergency_stop.store(true, Ordering::Release);
        let ts = Ts::from_nanos(now_ns);
        for idx in 0..self.slots.len() {
            if !self.used[idx].load(Ordering::Acquire) {
                continue;
            }
            let old_state = self.slots[idx].state;
            if old_state.is_terminal() {
                continue;
            }
            self.slots[idx].state = OrderState::Cancelled;
            let order_id = self.slots[idx].order_id;
            let price = self.slots[idx].limit_price;
            let qty = self.slots[idx].qty;
            self.push_audit(order_id, ts, old_state, OrderState::Cancelled, price, qty, "Emergency stop");
            self.release(idx);
        }
    }

    pub fn deactivate_emergency_halt(&mut self) {
        self.emergency_stop.store(false, Ordering::Release);
    }
}
