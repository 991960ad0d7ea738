//! The composition root: owns one instance of every component (C1/C4 ride
//! along inside `common`; C2 backs the order staging buffer in
//! [`crate::memory`]; C3 backs every ring the other crates expose) and
//! drives ticks through the pipeline described in §1's control-flow
//! summary:
//!
//! ```text
//! exchange frames -> C5 (feed) -> ticks/trades
//!                                    |
//!                     strategy (external) reads ticks
//!                                    |
//!                    C7 (risk) gate -> C8 (OMS) creates + routes order
//!                                    |
//!                              C6 (venue router)
//!                                    |
//!                    venue ack/fill -> C8 applies -> C9 (reconciliation)
//! ```

use crate::execution::ExecutionLayer;
use crate::metrics::EngineSnapshot;
use common::{OrderType, Price32nd, RawFrame, Side, Tick, TreasuryType};
use feed::{FeedHandler, FrameError};
use oms::{OlmConfig, TimeInForce};
use rand::Rng;
use reconciliation::{PositionReconciliationManager, SettlementReport};
use risk::{EnhancedLimits, RiskLimits, VolatilityLimits};
use venue_sim::{VenueParams, VenueRouter, VenueSimulator};

/// Construction-time tunables for every component (§6.5), gathered in one
/// place so a caller builds an [`Engine`] with a single struct literal.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub risk_limits: RiskLimits,
    pub enhanced_limits: EnhancedLimits,
    pub volatility_limits: VolatilityLimits,
    pub olm: OlmConfig,
    pub venues: Vec<VenueParams>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_limits: RiskLimits::default(),
            enhanced_limits: EnhancedLimits::default(),
            volatility_limits: VolatilityLimits::default(),
            olm: OlmConfig::default(),
            venues: vec![VenueParams::default(); 2],
        }
    }
}

/// The tick-to-trade core. Thread B of §5's deployment model: everything
/// reachable from here (except the feed's rings, fed by Thread A) runs
/// single-threaded on the execution thread.
pub struct Engine<R: Rng> {
    feed: FeedHandler,
    execution: ExecutionLayer<R>,
    position: PositionReconciliationManager,
}

impl<R: Rng> Engine<R> {
    /// Build a router with one [`VenueSimulator`] per entry in
    /// `config.venues`, each driven by its own RNG from `rngs`. Extra RNGs
    /// are ignored; a shortfall truncates the venue list.
    #[must_use]
    pub fn new(config: EngineConfig, rngs: Vec<R>) -> Self {
        let venues: Vec<VenueSimulator<R>> = config
            .venues
            .into_iter()
            .zip(rngs)
            .map(|(params, rng)| VenueSimulator::new(params, rng))
            .collect();
        let venue_count = venues.len();
        let router = VenueRouter::new(venues);

        let mut olm_config = config.olm;
        olm_config.max_venues = venue_count.max(1);

        Self {
            feed: FeedHandler::new(),
            execution: ExecutionLayer::new(config.risk_limits, config.enhanced_limits, config.volatility_limits, olm_config, router),
            position: PositionReconciliationManager::new(),
        }
    }

    /// Feed-handler entry point (C5). Counts the frame against the
    /// message-rate limit before parsing it, matching §4.7's Layer 1 gate.
    pub fn ingest_frame(&mut self, frame: &RawFrame, now_ns: u64) -> Result<(), FrameError> {
        self.execution.risk_mut().record_message(now_ns);
        self.feed.process_frame(frame)
    }

    pub fn ingest_batch(&mut self, frames: &[RawFrame]) -> (usize, usize) {
        self.feed.process_batch(frames)
    }

    /// Drain up to `scratch.len()` ticks and fan each one out to the
    /// volatility tracker (C7), the mark-to-market (C9), and every venue's
    /// fill simulation (C6). Returns the number of ticks processed.
    pub fn pump_ticks(&mut self, scratch: &mut [Tick], now_ns: u64) -> usize {
        let n = self.feed.tick_ring().try_pop_batch(scratch);
        for tick in &scratch[..n] {
            let mid = (tick.bid_price.to_decimal() + tick.ask_price.to_decimal()) / 2.0;
            self.execution.risk_mut().update_market_price(tick.instrument, mid, now_ns);
            self.position.update_market_price(tick.instrument, mid);
            self.execution.process_market_update(tick);
        }
        n
    }

    /// Create, risk-gate, and route an order in one call (§4.8). Returns
    /// `0` on any rejection.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(&mut self, instrument: TreasuryType, side: Side, order_type: OrderType, limit_price: Price32nd, yield_limit: f64, qty: u64, tif: TimeInForce, now_ns: u64) -> u64 {
        self.execution.submit_order(instrument, side, order_type, limit_price, yield_limit, qty, tif, now_ns)
    }

    pub fn request_cancel(&mut self, order_id: u64, now_ns: u64) -> bool {
        self.execution.request_cancel(order_id, now_ns)
    }

    /// Drain every venue's response ring and apply each ack/fill/reject to
    /// the OMS and, for fills, to position reconciliation (§4.8, §4.9).
    /// Returns the number of responses applied.
    pub fn pump_fills(&mut self, now_ns: u64) -> usize {
        self.execution.pump_fills(&mut self.position, now_ns)
    }

    /// Force every working order to `Cancelled` and block new submissions
    /// (§4.8 "Emergency stop").
    pub fn emergency_stop(&mut self, now_ns: u64) {
        self.execution.emergency_stop(now_ns);
    }

    #[must_use]
    pub fn position(&self) -> &PositionReconciliationManager {
        &self.position
    }

    #[must_use]
    pub fn position_mut(&mut self) -> &mut PositionReconciliationManager {
        &mut self.position
    }

    #[must_use]
    pub fn feed(&self) -> &FeedHandler {
        &self.feed
    }

    #[must_use]
    pub fn execution(&self) -> &ExecutionLayer<R> {
        &self.execution
    }

    /// Generate T+1 settlement instructions for every non-flat position
    /// (§4.9) and reset the daily position/break/risk state.
    pub fn end_of_day(&mut self, now_ns: u64) -> SettlementReport {
        let report = self.position.generate_settlements(now_ns);
        self.position.reset_daily();
        self.execution.reset_daily(now_ns);
        report
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::capture(&self.feed, &self.execution, &self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{frame_type, Ts};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(venues: usize) -> Engine<StdRng> {
        let config = EngineConfig {
            venues: vec![VenueParams::default(); venues],
            ..EngineConfig::default()
        };
        let rngs = (0..venues as u64).map(StdRng::seed_from_u64).collect();
        Engine::new(config, rngs)
    }

    fn tick_frame(seq: u64, instrument_id: u32, bid: f64, ask: f64) -> RawFrame {
        let mut payload = [0u8; 32];
        payload[0..8].copy_from_slice(&bid.to_le_bytes());
        payload[8..16].copy_from_slice(&ask.to_le_bytes());
        payload[16..24].copy_from_slice(&5_000_000u64.to_le_bytes());
        payload[24..32].copy_from_slice(&5_000_000u64.to_le_bytes());
        let mut frame = RawFrame {
            sequence: seq,
            exchange_ts_ns: seq,
            message_type: frame_type::TICK,
            instrument_id,
            payload,
            checksum: 0,
            _padding: [0; 6],
        };
        frame.checksum = frame.compute_checksum();
        frame
    }

    fn empty_scratch() -> [Tick; 8] {
        [Tick::new(TreasuryType::Bill3M, Ts::from_nanos(0), Price32nd::default(), Price32nd::default(), 0, 0, 0.0, 0.0); 8]
    }

    #[test]
    fn end_to_end_tick_to_fill() {
        // §8.3-style scenario: ingest a tick, submit a market order, feed
        // ticks until the simulated venue fills it, and confirm the fill
        // reaches position reconciliation.
        let mut engine = engine(1);
        engine.ingest_frame(&tick_frame(1, 5, 99.5, 99.515625), 0).unwrap();

        let mut scratch = empty_scratch();
        assert_eq!(engine.pump_ticks(&mut scratch, 1), 1);

        let order_id = engine.submit_order(TreasuryType::Note10Y, Side::Bid, OrderType::Market, Price32nd::default(), 0.0, 1_000_000, TimeInForce::Day, 2);
        assert_ne!(order_id, 0, "order should be accepted and routed");

        let mut filled = false;
        for t in 0..200u64 {
            engine.ingest_frame(&tick_frame(t + 2, 5, 99.5, 99.515625), t + 2).unwrap();
            engine.pump_ticks(&mut scratch, t + 2);
            engine.pump_fills(t + 2);
            if engine.execution().olm().get_order(order_id).is_none() {
                filled = true;
                break;
            }
        }
        assert!(filled, "market order should fill within 200 tick rounds at a 0.95 fill probability");
        assert!(engine.position().history_count() > 0, "the fill should have appended a position-history entry");
    }

    #[test]
    fn emergency_stop_blocks_new_submissions() {
        let mut engine = engine(1);
        engine.emergency_stop(10);
        let id = engine.submit_order(TreasuryType::Bill3M, Side::Bid, OrderType::Market, Price32nd::default(), 0.0, 100_000, TimeInForce::Day, 11);
        assert_eq!(id, 0);
    }

    #[test]
    fn risk_rejection_never_reaches_the_venue() {
        let mut engine = engine(1);
        let over_limit = engine.execution().risk().instrument_net_position(TreasuryType::Bill3M) + engine.execution().risk_limits().max_position_per_instrument + 1;
        let id = engine.submit_order(TreasuryType::Bill3M, Side::Bid, OrderType::Market, Price32nd::default(), 0.0, over_limit as u64, TimeInForce::Day, 0);
        assert_eq!(id, 0);
    }

    #[test]
    fn end_of_day_generates_settlements_and_resets() {
        let mut engine = engine(1);
        engine.position_mut().update_position(TreasuryType::Bill3M, 0, Side::Bid, 100_000, Price32nd::from_decimal(100.0), 1, 0).unwrap();
        engine.position_mut().update_market_price(TreasuryType::Bill3M, 100.0);
        let report = engine.end_of_day(1_000);
        assert_eq!(report.count, 1);
        assert!(engine.position().position(TreasuryType::Bill3M, 0).unwrap().is_flat());
    }
}
