//! `OrderRecord` and `AuditEntry` (§3.2): the OMS's per-order state and the
//! append-only compliance trail every transition writes to.

use crate::state::{OrderState, TimeInForce};
use common::{OrderType, Price32nd, Side, TreasuryType, Ts};

/// The OMS's view of a working order: two cache lines, 128 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct OrderRecord {
    pub order_id: u64,
    pub client_id: u64,
    pub ts_created: Ts,
    pub ts_venue: Ts,
    pub instrument: TreasuryType,
    pub order_type: OrderType,
    pub side: Side,
    pub state: OrderState,
    pub limit_price: Price32nd,
    pub yield_limit: f64,
    pub qty: u64,
    pub filled_qty: u64,
    pub remaining_qty: u64,
    pub venue_order_id: u64,
    pub time_in_force: TimeInForce,
    pub target_venue: u32,
    _pad: [u8; 38],
}

const _: () = assert!(std::mem::size_of::<OrderRecord>() == 128);

impl OrderRecord {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        order_id: u64,
        client_id: u64,
        ts_created: Ts,
        instrument: TreasuryType,
        order_type: OrderType,
        side: Side,
        limit_price: Price32nd,
        yield_limit: f64,
        qty: u64,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            order_id,
            client_id,
            ts_created,
            ts_venue: ts_created,
            instrument,
            order_type,
            side,
            state: OrderState::Created,
            limit_price,
            yield_limit,
            qty,
            filled_qty: 0,
            remaining_qty: qty,
            venue_order_id: 0,
            time_in_force,
            target_venue: u32::MAX,
            _pad: [0; 38],
        }
    }

    #[must_use]
    pub const fn invariant_holds(&self) -> bool {
        self.filled_qty + self.remaining_qty == self.qty
    }
}

/// Append-only audit trail entry (§3.2), 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct AuditEntry {
    pub entry_id: u64,
    pub order_id: u64,
    pub ts: Ts,
    pub old_state: OrderState,
    pub new_state: OrderState,
    _pad0: [u8; 6],
    pub price: Price32nd,
    pub qty: u64,
    pub reason: [u8; 16],
    _pad1: [u8; 8],
}

const _: () = assert!(std::mem::size_of::<AuditEntry>() == 64);

impl AuditEntry {
    #[must_use]
    pub fn new(entry_id: u64, order_id: u64, ts: Ts, old_state: OrderState, new_state: OrderState, price: Price32nd, qty: u64, reason: &str) -> Self {
        let mut reason_bytes = [0u8; 16];
        let bytes = reason.as_bytes();
        let n = bytes.len().min(16);
        reason_bytes[..n].copy_from_slice(&bytes[..n]);
        Self {
            entry_id,
            order_id,
            ts,
            old_state,
            new_state,
            _pad0: [0; 6],
            price,
            qty,
            reason: reason_bytes,
            _pad1: [0; 8],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_record_is_128_bytes() {
        assert_eq!(std::mem::size_of::<OrderRecord>(), 128);
    }

    #[test]
    fn audit_entry_is_64_bytes() {
        assert_eq!(std::mem::size_of::<AuditEntry>(), 64);
    }

    #[test]
    fn new_record_satisfies_qty_invariant() {
        let r = OrderRecord::new(
            1,
            1,
            Ts::from_nanos(0),
            TreasuryType::Bill3M,
            OrderType::Limit,
            Side::Bid,
            Price32nd::new(99, 16, 0),
            0.0,
            100_000,
            TimeInForce::Day,
        );
        assert!(r.invariant_holds());
    }
}
