//! C9: position reconciliation manager. Owns the `positions[instrument][venue]`
//! table, the position-history ring, the break ring, and settlement
//! generation (§4.9).

use crate::error::ReconciliationError;
use crate::types::{BreakType, PositionBreak, PositionHistoryEntry, SettlementInstruction, VenuePosition};
use common::{NUM_INSTRUMENTS, Price32nd, Side, TreasuryType, Ts};

pub const MAX_VENUES: usize = 8;
pub const MAX_SETTLEMENT_ENTRIES: usize = 10_000;
pub const MAX_POSITION_HISTORY: usize = 100_000;
pub const MAX_BREAKS: usize = 1_000;

/// Reconciliation tolerance: a venue-reported quantity within this many
/// units of the internal net position is not a break (§4.9).
const RECONCILIATION_TOLERANCE: i64 = 1;

fn boxed_array<T: Clone, const N: usize>(item: T) -> Box<[T; N]> {
    let v = vec![item; N];
    match v.into_boxed_slice().try_into() {
        Ok(arr) => arr,
        Err(_) => unreachable!("vec![_; N] always has length N"),
    }
}

/// A snapshot of pending settlement obligations generated at day-close
/// (§6.4). Regenerated fresh each call; not an accumulating ring.
pub struct SettlementReport {
    pub report_date: Ts,
    pub entries: Box<[SettlementInstruction; MAX_SETTLEMENT_ENTRIES]>,
    pub count: usize,
    pub total_value: f64,
    pub generated_at: Ts,
}

/// Owns every instrument/venue position, a position-history audit ring, a
/// break ledger, and settlement generation. Single-threaded on its hot path
/// (§5, Thread B).
pub struct PositionReconciliationManager {
    positions: Box<[[VenuePosition; MAX_VENUES]; NUM_INSTRUMENTS]>,
    market_price: [f64; NUM_INSTRUMENTS],

    history: Box<[PositionHistoryEntry; MAX_POSITION_HISTORY]>,
    next_history_id: u64,

    breaks: Box<[PositionBreak; MAX_BREAKS]>,
    next_break_id: u64,
    triggered_breaks: u64,
    resolved_breaks: u64,

    next_settlement_id: u64,
}

impl Default for PositionReconciliationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionReconciliationManager {
    #[must_use]
    pub fn new() -> Self {
        let positions = Box::new(std::array::from_fn(|i| {
            let instrument = TreasuryType::from_index(i).expect("i < NUM_INSTRUMENTS");
            std::array::from_fn(|venue| VenuePosition::new(instrument, venue as u32))
        }));

        Self {
            positions,
            market_price: [0.0; NUM_INSTRUMENTS],
            history: boxed_array(PositionHistoryEntry::new(Ts::from_nanos(0), TreasuryType::Bill3M, 0, Side::Bid, 0, Price32nd::default(), 0, 0.0, 0)),
            next_history_id: 0,
            breaks: boxed_array(PositionBreak::new(0, Ts::from_nanos(0), TreasuryType::Bill3M, 0, BreakType::PositionMismatch, 0, 0)),
            next_break_id: 0,
            triggered_breaks: 0,
            resolved_breaks: 0,
            next_settlement_id: 0,
        }
    }

    #[must_use]
    pub fn position(&self, instrument: TreasuryType, venue: usize) -> Option<&VenuePosition> {
        self.positions[instrument.index()].get(venue)
    }

    fn push_history(&mut self, entry: PositionHistoryEntry) {
        let idx = (self.next_history_id as usize) % self.history.len();
        self.history[idx] = entry;
        self.next_history_id += 1;
    }

    #[must_use]
    pub fn history_count(&self) -> u64 {
        self.next_history_id
    }

    #[must_use]
    pub fn history_entry(&self, entry_id: u64) -> Option<PositionHistoryEntry> {
        if entry_id >= self.next_history_id || self.next_history_id - entry_id > self.history.len() as u64 {
            return None;
        }
        Some(self.history[(entry_id as usize) % self.history.len()])
    }

    /// Apply one fill to the position table (§4.9, 200 ns budget).
    pub fn update_position(&mut self, instrument: TreasuryType, venue: usize, side: Side, qty: u64, price: Price32nd, order_id: u64, now_ns: u64) -> Result<(), ReconciliationError> {
        if venue >= MAX_VENUES {
            return Err(ReconciliationError::UnknownVenue);
        }

        let delta = match side {
            Side::Bid => qty as i64,
            Side::Ask => -(qty as i64),
        };

        let pos = &mut self.positions[instrument.index()][venue];
        let old_net = pos.net_qty;
        let new_net = old_net + delta;
        let px = price.to_decimal();

        let same_direction_or_opening = old_net == 0 || (old_net > 0) == (delta > 0);
        if same_direction_or_opening {
            let old_abs = old_net.unsigned_abs() as f64;
            let add_abs = delta.unsigned_abs() as f64;
            let total = old_abs + add_abs;
            if total > 0.0 {
                pos.wacp = (pos.wacp * old_abs + px * add_abs) / total;
            }
        } else {
            let closed_qty = delta.unsigned_abs().min(old_net.unsigned_abs()) as f64;
            let direction = if old_net > 0 { 1.0 } else { -1.0 };
            pos.realized_pnl += direction * closed_qty * (px - pos.wacp);
        }

        pos.net_qty = new_net;
        let ts = Ts::from_nanos(now_ns);
        pos.last_update = ts;
        pos.last_trade = ts;

        let market = self.market_price[instrument.index()];
        let pos = &mut self.positions[instrument.index()][venue];
        pos.unrealized_pnl = pos.net_qty as f64 * (market - pos.wacp);

        let net_after = pos.net_qty;
        let realized_after = pos.realized_pnl;
        self.push_history(PositionHistoryEntry::new(ts, instrument, venue as u32, side, qty, price, net_after, realized_after, order_id));
        Ok(())
    }

    /// Mark-to-market every venue position in `instrument` against `price`.
    pub fn update_market_price(&mut self, instrument: TreasuryType, price: f64) {
        self.market_price[instrument.index()] = price;
        for pos in &mut self.positions[instrument.index()] {
            pos.unrealized_pnl = pos.net_qty as f64 * (price - pos.wacp);
        }
    }

    /// Compare the internal net against a venue-reported quantity. Returns
    /// `true` iff no break was raised (§4.9).
    pub fn reconcile_venue_position(&mut self, instrument: TreasuryType, venue: usize, reported_qty: i64, now_ns: u64) -> Result<bool, ReconciliationError> {
        if venue >= MAX_VENUES {
            return Err(ReconciliationError::UnknownVenue);
        }
        let expected = self.positions[instrument.index()][venue].net_qty;
        if (reported_qty - expected).abs() <= RECONCILIATION_TOLERANCE {
            return Ok(true);
        }

        let break_id = self.next_break_id;
        self.next_break_id += 1;
        let idx = (break_id as usize) % self.breaks.len();
        self.breaks[idx] = PositionBreak::new(break_id, Ts::from_nanos(now_ns), instrument, venue as u32, BreakType::PositionMismatch, expected, reported_qty);
        self.triggered_breaks += 1;
        Ok(false)
    }

    pub fn resolve_position_break(&mut self, break_id: u64, notes: &str, now_ns: u64) -> Result<(), ReconciliationError> {
        if break_id >= self.next_break_id || self.next_break_id - break_id > self.breaks.len() as u64 {
            return Err(ReconciliationError::UnknownBreak);
        }
        let idx = (break_id as usize) % self.breaks.len();
        if self.breaks[idx].break_id != break_id {
            return Err(ReconciliationError::UnknownBreak);
        }
        self.breaks[idx].resolve(now_ns, notes);
        self.resolved_breaks += 1;
        Ok(())
    }

    #[must_use]
    pub fn get_break(&self, break_id: u64) -> Option<PositionBreak> {
        if break_id >= self.next_break_id || self.next_break_id - break_id > self.breaks.len() as u64 {
            return None;
        }
        let idx = (break_id as usize) % self.breaks.len();
        (self.breaks[idx].break_id == break_id).then_some(self.breaks[idx])
    }

    #[must_use]
    pub fn triggered_break_count(&self) -> u64 {
        self.triggered_breaks
    }

    #[must_use]
    pub fn resolved_break_count(&self) -> u64 {
        self.resolved_breaks
    }

    /// Scan every non-zero position and emit one pending settlement
    /// instruction per (instrument, venue) (§4.9, T+1).
    #[must_use]
    pub fn generate_settlements(&mut self, now_ns: u64) -> SettlementReport {
        let trade_date = Ts::from_nanos(now_ns);
        let mut entries = boxed_array(SettlementInstruction::new(0, TreasuryType::Bill3M, 0, 0, Price32nd::default(), 0.0, trade_date));
        let mut count = 0usize;
        let mut total_value = 0.0;

        'outer: for instrument in TreasuryType::ALL {
            let market = self.market_price[instrument.index()];
            let price = Price32nd::from_decimal(market);
            for (venue, pos) in self.positions[instrument.index()].iter().enumerate() {
                if pos.is_flat() {
                    continue;
                }
                if count >= MAX_SETTLEMENT_ENTRIES {
                    tracing::warn!(dropped = true, "settlement report capacity exhausted");
                    break 'outer;
                }
                let value = pos.net_qty as f64 * market;
                entries[count] = SettlementInstruction::new(self.next_settlement_id, instrument, venue as u32, pos.net_qty, price, value, trade_date);
                self.next_settlement_id += 1;
                total_value += value;
                count += 1;
            }
        }

        SettlementReport {
            report_date: trade_date,
            entries,
            count,
            total_value,
            generated_at: trade_date,
        }
    }

    /// Zero every position, P&L field, and break/settlement counter state.
    pub fn reset_daily(&mut self) {
        for row in self.positions.iter_mut() {
            for pos in row.iter_mut() {
                let instrument = pos.instrument;
                let venue = pos.venue;
                *pos = VenuePosition::new(instrument, venue);
            }
        }
        self.market_price = [0.0; NUM_INSTRUMENTS];
        self.triggered_breaks = 0;
        self.resolved_breaks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_a_position_sets_wacp_to_fill_price() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100_000, Price32nd::new(99, 16, 0), 1, 0).unwrap();
        let pos = m.position(TreasuryType::Bill3M, 0).unwrap();
        assert_eq!(pos.net_qty, 100_000);
        assert!((pos.wacp - Price32nd::new(99, 16, 0).to_decimal()).abs() < 1e-9);
    }

    #[test]
    fn same_direction_fills_size_weight_the_wacp() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(102.0), 2, 0).unwrap();
        let pos = m.position(TreasuryType::Bill3M, 0).unwrap();
        assert_eq!(pos.net_qty, 200);
        assert!((pos.wacp - 101.0).abs() < 1e-6);
    }

    #[test]
    fn closing_trade_realizes_pnl_and_preserves_wacp() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        m.update_position(TreasuryType::Bill3M, 0, Side::Ask, 40, Price32nd::from_decimal(105.0), 2, 0).unwrap();
        let pos = m.position(TreasuryType::Bill3M, 0).unwrap();
        assert_eq!(pos.net_qty, 60);
        assert!((pos.wacp - 100.0).abs() < 1e-6, "wacp preserved on a closing trade");
        assert!((pos.realized_pnl - 200.0).abs() < 1e-6, "40 * (105 - 100)");
    }

    #[test]
    fn reconcile_within_tolerance_raises_no_break() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        assert!(m.reconcile_venue_position(TreasuryType::Bill3M, 0, 101, 1).unwrap());
        assert_eq!(m.triggered_break_count(), 0);
    }

    #[test]
    fn reconcile_beyond_tolerance_raises_a_break() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        assert!(!m.reconcile_venue_position(TreasuryType::Bill3M, 0, 103, 1).unwrap());
        assert_eq!(m.triggered_break_count(), 1);
        let b = m.get_break(0).unwrap();
        assert_eq!(b.variance, 3);
        assert!(!b.resolved);
    }

    #[test]
    fn resolve_position_break_marks_resolved() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        m.reconcile_venue_position(TreasuryType::Bill3M, 0, 200, 1).unwrap();
        m.resolve_position_break(0, "confirmed venue-side fill", 2).unwrap();
        assert!(m.get_break(0).unwrap().resolved);
        assert_eq!(m.resolved_break_count(), 1);
    }

    #[test]
    fn settlement_report_only_covers_non_flat_positions() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100_000, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        m.update_market_price(TreasuryType::Bill3M, 100.0);
        let report = m.generate_settlements(1_000);
        assert_eq!(report.count, 1);
        assert_eq!(report.entries[0].net_qty, 100_000);
        assert_eq!(report.entries[0].settlement_date.as_nanos(), 1_000 + crate::types::SETTLEMENT_LAG_NS);
    }

    #[test]
    fn reset_daily_clears_positions_and_breaks() {
        let mut m = PositionReconciliationManager::new();
        m.update_position(TreasuryType::Bill3M, 0, Side::Bid, 100, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        m.reconcile_venue_position(TreasuryType::Bill3M, 0, 500, 1).unwrap();
        m.reset_daily();
        assert!(m.position(TreasuryType::Bill3M, 0).unwrap().is_flat());
        assert_eq!(m.triggered_break_count(), 0);
    }
}
