//! C9 record types (§3.2): the per-(instrument, venue) position, a
//! settlement instruction, a position break, and a position-history entry.

use common::{Price32nd, Side, TreasuryType, Ts};

/// One instrument's position at one venue. 64 bytes.
///
/// `wacp` (weighted-average cost price) is undefined when `net == 0`; the
/// field is left at its last value rather than reset, matching
/// [`Self::unrealized_pnl`] staying `0.0` once flat.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct VenuePosition {
    pub instrument: TreasuryType,
    _pad0: [u8; 3],
    pub venue: u32,
    pub net_qty: i64,
    pub pending_settlement: i64,
    pub wacp: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub last_update: Ts,
    pub last_trade: Ts,
}

const _: () = assert!(std::mem::size_of::<VenuePosition>() == 64);

impl VenuePosition {
    #[must_use]
    pub const fn new(instrument: TreasuryType, venue: u32) -> Self {
        Self {
            instrument,
            _pad0: [0; 3],
            venue,
            net_qty: 0,
            pending_settlement: 0,
            wacp: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            last_update: Ts::from_nanos(0),
            last_trade: Ts::from_nanos(0),
        }
    }

    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.net_qty == 0
    }
}

/// Settlement instruction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SettlementStatus {
    Pending = 0,
    Settled = 1,
    Failed = 2,
}

/// One instrument/venue's settlement obligation, generated at day-close.
/// 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct SettlementInstruction {
    pub settlement_id: u64,
    pub instrument: TreasuryType,
    pub status: SettlementStatus,
    _pad0: [u8; 2],
    pub venue: u32,
    pub net_qty: i64,
    pub price: Price32nd,
    pub value: f64,
    pub trade_date: Ts,
    pub settlement_date: Ts,
    _pad1: [u8; 8],
}

const _: () = assert!(std::mem::size_of::<SettlementInstruction>() == 64);

/// One business day, modelled as exactly 24 hours (§4.9).
pub const SETTLEMENT_LAG_NS: u64 = 86_400 * 1_000_000_000;

impl SettlementInstruction {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(settlement_id: u64, instrument: TreasuryType, venue: u32, net_qty: i64, price: Price32nd, value: f64, trade_date: Ts) -> Self {
        Self {
            settlement_id,
            instrument,
            status: SettlementStatus::Pending,
            _pad0: [0; 2],
            venue,
            net_qty,
            price,
            value,
            trade_date,
            settlement_date: Ts::from_nanos(trade_date.as_nanos() + SETTLEMENT_LAG_NS),
            _pad1: [0; 8],
        }
    }
}

/// Break classification. `PositionMismatch` is the only kind the
/// reconciliation loop raises itself; the others are reserved for a future
/// settlement/price-break check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BreakType {
    PositionMismatch = 0,
    SettlementMismatch = 1,
    PriceMismatch = 2,
}

/// A detected reconciliation discrepancy. 128 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct PositionBreak {
    pub break_id: u64,
    pub detection_ts: Ts,
    pub instrument: TreasuryType,
    _pad0: [u8; 3],
    pub venue: u32,
    pub break_type: BreakType,
    pub resolved: bool,
    _pad1: [u8; 2],
    pub expected_qty: i64,
    pub actual_qty: i64,
    pub variance: i64,
    pub resolution_ts: Ts,
    pub description: [u8; 16],
    _pad2: [u8; 52],
}

const _: () = assert!(std::mem::size_of::<PositionBreak>() == 128);

fn copy_description(text: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    let bytes = text.as_bytes();
    let n = bytes.len().min(16);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

impl PositionBreak {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(break_id: u64, detection_ts: Ts, instrument: TreasuryType, venue: u32, break_type: BreakType, expected_qty: i64, actual_qty: i64) -> Self {
        Self {
            break_id,
            detection_ts,
            instrument,
            _pad0: [0; 3],
            venue,
            break_type,
            resolved: false,
            _pad1: [0; 2],
            expected_qty,
            actual_qty,
            variance: actual_qty - expected_qty,
            resolution_ts: Ts::from_nanos(0),
            description: copy_description("position variance"),
            _pad2: [0; 52],
        }
    }

    pub fn resolve(&mut self, now_ns: u64, notes: &str) {
        self.resolved = true;
        self.resolution_ts = Ts::from_nanos(now_ns);
        self.description = copy_description(notes);
    }
}

/// Append-only audit record of one position update (§4.9 step 7). 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct PositionHistoryEntry {
    pub ts: Ts,
    pub instrument: TreasuryType,
    pub venue: u32,
    pub side: Side,
    _pad0: [u8; 1],
    pub qty: u64,
    pub price: Price32nd,
    pub net_after: i64,
    pub realized_pnl_after: f64,
    pub order_id: u64,
    _pad1: [u8; 8],
}

const _: () = assert!(std::mem::size_of::<PositionHistoryEntry>() == 64);

impl PositionHistoryEntry {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(ts: Ts, instrument: TreasuryType, venue: u32, side: Side, qty: u64, price: Price32nd, net_after: i64, realized_pnl_after: f64, order_id: u64) -> Self {
        Self {
            ts,
            instrument,
            venue,
            side,
            _pad0: [0; 1],
            qty,
            price,
            net_after,
            realized_pnl_after,
            order_id,
            _pad1: [0; 8],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_position_is_64_bytes() {
        assert_eq!(std::mem::size_of::<VenuePosition>(), 64);
    }

    #[test]
    fn settlement_instruction_is_64_bytes() {
        assert_eq!(std::mem::size_of::<SettlementInstruction>(), 64);
    }

    #[test]
    fn position_break_is_128_bytes() {
        assert_eq!(std::mem::size_of::<PositionBreak>(), 128);
    }

    #[test]
    fn position_history_entry_is_64_bytes() {
        assert_eq!(std::mem::size_of::<PositionHistoryEntry>(), 64);
    }

    #[test]
    fn settlement_date_is_trade_date_plus_one_day() {
        let s = SettlementInstruction::new(1, TreasuryType::Bill3M, 0, 100_000, Price32nd::new(99, 16, 0), 99_500.0, Ts::from_nanos(1_000));
        assert_eq!(s.settlement_date.as_nanos(), 1_000 + SETTLEMENT_LAG_NS);
    }

    #[test]
    fn break_variance_is_actual_minus_expected() {
        let b = PositionBreak::new(1, Ts::from_nanos(0), TreasuryType::Note10Y, 2, BreakType::PositionMismatch, 100, 105);
        assert_eq!(b.variance, 5);
    }
}
