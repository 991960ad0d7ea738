//! C5: exchange frame validation, sequence/duplicate discipline, and
//! normalization of raw frames into [`Tick`]/[`Trade`] records published to
//! two SPSC rings.

mod stats;

pub use stats::FeedStats;

use common::{frame_type, Clock, LatencyHistogram, Price32nd, RawFrame, Tick, Trade, TreasuryType, Ts};
use ring::SpscRing;
use thiserror::Error;

pub const RECENT_SEQUENCE_RING_LEN: usize = 1024;
pub const TICK_RING_CAPACITY: usize = 8192;
pub const TRADE_RING_CAPACITY: usize = 8192;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("checksum mismatch")]
    InvalidChecksum,
    #[error("unrecognized message type tag")]
    InvalidFormat,
    #[error("duplicate sequence number")]
    Duplicate,
    #[error("decoded record failed its validity invariant")]
    InvalidRecord,
    #[error("downstream ring is full")]
    RingFull,
}

/// Exchange id -> Treasury tenor. Out-of-range ids fall through to
/// `Bill_3M` and are counted as invalid-format frames (a known-conservative
/// default carried forward unchanged from the reference implementation).
fn normalize_instrument(id: u32) -> (TreasuryType, bool) {
    match TreasuryType::from_wire_id(id) {
        Some(t) => (t, true),
        None => (TreasuryType::Bill3M, false),
    }
}

/// Fixed-size pipeline stage: validates, normalizes, and publishes raw
/// frames into the tick and trade rings.
pub struct FeedHandler {
    expected_sequence: u64,
    recent_sequences: Box<[u64; RECENT_SEQUENCE_RING_LEN]>,
    recent_index: usize,
    tick_ring: SpscRing<Tick, TICK_RING_CAPACITY>,
    trade_ring: SpscRing<Trade, TRADE_RING_CAPACITY>,
    parse_latency: LatencyHistogram,
    stats: FeedStats,
}

impl FeedHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected_sequence: 0,
            recent_sequences: Box::new([u64::MAX; RECENT_SEQUENCE_RING_LEN]),
            recent_index: 0,
            tick_ring: SpscRing::new(),
            trade_ring: SpscRing::new(),
            parse_latency: LatencyHistogram::new(),
            stats: FeedStats::default(),
        }
    }

    #[must_use]
    pub fn tick_ring(&self) -> &SpscRing<Tick, TICK_RING_CAPACITY> {
        &self.tick_ring
    }

    #[must_use]
    pub fn trade_ring(&self) -> &SpscRing<Trade, TRADE_RING_CAPACITY> {
        &self.trade_ring
    }

    #[must_use]
    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = FeedStats::default();
        self.parse_latency.reset();
    }

    fn check_sequence(&mut self, seq: u64) {
        if self.expected_sequence != 0 && seq != self.expected_sequence {
            self.stats.sequence_gaps += 1;
        }
        self.expected_sequence = seq + 1;
    }

    fn is_duplicate(&mut self, seq: u64) -> bool {
        if self.recent_sequences.contains(&seq) {
            return true;
        }
        self.recent_sequences[self.recent_index] = seq;
        self.recent_index = (self.recent_index + 1) % RECENT_SEQUENCE_RING_LEN;
        false
    }

    /// Process one frame. Every failure is a local drop plus a counter
    /// bump; nothing here ever panics or returns an exception-like signal.
    pub fn process_frame(&mut self, frame: &RawFrame) -> Result<(), FrameError> {
        let start = Clock::cycles();
        let result = self.process_frame_inner(frame);
        let elapsed = Clock::cycles_to_ns(Clock::cycles() - start);
        self.parse_latency.record_latency(elapsed);
        self.stats.total_processed += 1;
        if let Err(e) = result {
            // Duplicate frames already bump `duplicate_messages` in
            // `is_duplicate`; they are not also counted as invalid (§8.3
            // scenario 2: duplicate=1, invalid=0 for a repeated sequence).
            if e != FrameError::Duplicate {
                self.stats.invalid_messages += 1;
            }
            return Err(e);
        }
        Ok(())
    }

    fn process_frame_inner(&mut self, frame: &RawFrame) -> Result<(), FrameError> {
        if self.is_duplicate(frame.sequence) {
            self.stats.duplicate_messages += 1;
            return Err(FrameError::Duplicate);
        }

        self.check_sequence(frame.sequence);

        if !frame.checksum_valid() {
            return Err(FrameError::InvalidChecksum);
        }

        match frame.message_type {
            frame_type::TICK => self.decode_and_publish_tick(frame),
            frame_type::TRADE => self.decode_and_publish_trade(frame),
            frame_type::HEARTBEAT => Ok(()),
            _ => Err(FrameError::InvalidFormat),
        }
    }

    fn decode_and_publish_tick(&mut self, frame: &RawFrame) -> Result<(), FrameError> {
        let (instrument, recognized) = normalize_instrument(frame.instrument_id);
        if !recognized {
            self.stats.invalid_messages += 1;
        }

        let payload = &frame.payload;
        let bid_price_dec = f64::from_le_bytes(payload[0..8].try_into().unwrap());
        let ask_price_dec = f64::from_le_bytes(payload[8..16].try_into().unwrap());
        let bid_size = u64::from_le_bytes(payload[16..24].try_into().unwrap());
        let ask_size = u64::from_le_bytes(payload[24..32].try_into().unwrap());

        let bid_price = Price32nd::from_decimal(bid_price_dec);
        let ask_price = Price32nd::from_decimal(ask_price_dec);

        let maturity_days = tenor_maturity_days(instrument);
        let bid_yield = common::YieldCalculator::price_to_yield(bid_price, maturity_days);
        let ask_yield = common::YieldCalculator::price_to_yield(ask_price, maturity_days);

        let tick = Tick::new(
            instrument,
            Ts::from_nanos(frame.exchange_ts_ns),
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            bid_yield,
            ask_yield,
        );

        if !tick.is_valid() {
            return Err(FrameError::InvalidRecord);
        }

        if !self.tick_ring.try_push(tick) {
            return Err(FrameError::RingFull);
        }
        Ok(())
    }

    fn decode_and_publish_trade(&mut self, frame: &RawFrame) -> Result<(), FrameError> {
        let (instrument, recognized) = normalize_instrument(frame.instrument_id);
        if !recognized {
            self.stats.invalid_messages += 1;
        }

        let payload = &frame.payload;
        let price_dec = f64::from_le_bytes(payload[0..8].try_into().unwrap());
        let size = u64::from_le_bytes(payload[8..16].try_into().unwrap());
        let mut trade_id = [0u8; 16];
        trade_id.copy_from_slice(&payload[16..32]);

        let price = Price32nd::from_decimal(price_dec);
        let maturity_days = tenor_maturity_days(instrument);
        let yield_value = common::YieldCalculator::price_to_yield(price, maturity_days);

        let trade = Trade::new(instrument, Ts::from_nanos(frame.exchange_ts_ns), price, size, yield_value, trade_id);

        if !trade.is_valid() {
            return Err(FrameError::InvalidRecord);
        }

        if !self.trade_ring.try_push(trade) {
            return Err(FrameError::RingFull);
        }
        Ok(())
    }

    /// Process `[begin, end)`. Returns `(valid_count, invalid_count)`.
    pub fn process_batch(&mut self, frames: &[RawFrame]) -> (usize, usize) {
        let mut valid = 0usize;
        let mut invalid = 0usize;
        let mut iter = frames.iter().peekable();
        while let Some(frame) = iter.next() {
            if let Some(next) = iter.peek() {
                prefetch_frame(next);
            }
            match self.process_frame(frame) {
                Ok(()) => valid += 1,
                Err(_) => invalid += 1,
            }
        }
        (valid, invalid)
    }
}

impl Default for FeedHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Rough tenor maturities used purely to drive the yield conversion; not a
/// calendar-accurate day-count.
fn tenor_maturity_days(instrument: TreasuryType) -> u32 {
    match instrument {
        TreasuryType::Bill3M => 91,
        TreasuryType::Bill6M => 182,
        TreasuryType::Note2Y => 730,
        TreasuryType::Note5Y => 1_825,
        TreasuryType::Note10Y => 3_650,
        TreasuryType::Bond30Y => 10_950,
    }
}

#[inline(always)]
fn prefetch_frame(_frame: &RawFrame) {
    #[cfg(target_arch = "x86_64")]
    {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        // SAFETY: `_frame` is a valid reference for the duration of this call.
        unsafe { _mm_prefetch((_frame as *const RawFrame).cast::<i8>(), _MM_HINT_T0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tick_frame(seq: u64, instrument_id: u32, bid: f64, ask: f64) -> RawFrame {
        let mut payload = [0u8; 32];
        payload[0..8].copy_from_slice(&bid.to_le_bytes());
        payload[8..16].copy_from_slice(&ask.to_le_bytes());
        payload[16..24].copy_from_slice(&1_000_000u64.to_le_bytes());
        payload[24..32].copy_from_slice(&1_000_000u64.to_le_bytes());

        let mut frame = RawFrame {
            sequence: seq,
            exchange_ts_ns: 1,
            message_type: frame_type::TICK,
            instrument_id,
            payload,
            checksum: 0,
            _padding: [0; 6],
        };
        frame.checksum = frame.compute_checksum();
        frame
    }

    #[test]
    fn valid_tick_frame_publishes_to_tick_ring() {
        let mut handler = FeedHandler::new();
        let frame = make_tick_frame(1, 5, 99.5, 99.515625);
        handler.process_frame(&frame).expect("valid frame");
        assert_eq!(handler.tick_ring().len(), 1);
        let stats = handler.stats();
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.invalid_messages, 0);
    }

    #[test]
    fn duplicate_sequence_is_dropped() {
        let mut handler = FeedHandler::new();
        let frame = make_tick_frame(7, 1, 99.0, 99.25);
        handler.process_frame(&frame).unwrap();
        let result = handler.process_frame(&frame);
        assert_eq!(result, Err(FrameError::Duplicate));
        assert_eq!(handler.stats().duplicate_messages, 1);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let mut handler = FeedHandler::new();
        let mut frame = make_tick_frame(1, 1, 99.0, 99.25);
        frame.checksum ^= 0xFF;
        let result = handler.process_frame(&frame);
        assert_eq!(result, Err(FrameError::InvalidChecksum));
    }

    #[test]
    fn sequence_gap_is_counted_but_not_fatal() {
        let mut handler = FeedHandler::new();
        handler.process_frame(&make_tick_frame(1, 1, 99.0, 99.25)).unwrap();
        handler.process_frame(&make_tick_frame(5, 1, 99.0, 99.25)).unwrap();
        assert_eq!(handler.stats().sequence_gaps, 1);
    }

    #[test]
    fn unknown_instrument_falls_back_to_bill_3m() {
        let mut handler = FeedHandler::new();
        let frame = make_tick_frame(1, 99, 99.0, 99.25);
        handler.process_frame(&frame).expect("falls back, still valid");
        assert_eq!(handler.stats().invalid_messages, 1);
        let mut out = [common::Tick::new(
            TreasuryType::Bill3M,
            Ts::from_nanos(0),
            Price32nd::new(0, 0, 0),
            Price32nd::new(0, 0, 0),
            0,
            0,
            0.0,
            0.0,
        ); 1];
        let popped = handler.tick_ring().try_pop_batch(&mut out);
        assert_eq!(popped, 1);
        assert_eq!(out[0].instrument, TreasuryType::Bill3M);
    }

    #[test]
    fn unknown_message_type_is_invalid_format() {
        let mut handler = FeedHandler::new();
        let mut frame = make_tick_frame(1, 1, 99.0, 99.25);
        frame.message_type = 77;
        frame.checksum = frame.compute_checksum();
        let result = handler.process_frame(&frame);
        assert_eq!(result, Err(FrameError::InvalidFormat));
    }

    #[test]
    fn batch_reports_valid_and_invalid_counts() {
        let mut handler = FeedHandler::new();
        let frames = vec![
            make_tick_frame(1, 1, 99.0, 99.25),
            make_tick_frame(2, 1, 99.0, 99.25),
            make_tick_frame(1, 1, 99.0, 99.25), // duplicate
        ];
        let (valid, invalid) = handler.process_batch(&frames);
        assert_eq!(valid, 2);
        assert_eq!(invalid, 1);
    }
}
