//! Cache-aligned wire and cross-component records (§3.2). Each of these
//! crosses at least one producer/consumer boundary (feed -> strategy,
//! strategy -> OMS -> venue simulator), so they live here rather than in
//! the crate that happens to produce them first.

use crate::instrument::TreasuryType;
use crate::price::Price32nd;
use crate::types::{OrderType, Side, Ts};

/// Exact 64-byte little-endian exchange frame (§6.1). Parsed by the feed
/// handler; never constructed anywhere else.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawFrame {
    pub sequence: u64,
    pub exchange_ts_ns: u64,
    pub message_type: u32,
    pub instrument_id: u32,
    pub payload: [u8; 32],
    pub checksum: u16,
    pub _padding: [u8; 6],
}

const _: () = assert!(std::mem::size_of::<RawFrame>() == 64);

/// Wire `message_type` tag values (§6.1).
pub mod frame_type {
    pub const INVALID: u32 = 0;
    pub const TICK: u32 = 1;
    pub const TRADE: u32 = 2;
    pub const HEARTBEAT: u32 = 3;
}

impl RawFrame {
    /// XOR of bytes `[0, 56)`, reduced into the low byte of a 16-bit
    /// accumulator — matches the wire format's checksum algorithm exactly.
    #[must_use]
    pub fn compute_checksum(&self) -> u16 {
        let mut acc: u16 = 0;
        let seq = self.sequence.to_le_bytes();
        let ts = self.exchange_ts_ns.to_le_bytes();
        let mtype = self.message_type.to_le_bytes();
        let iid = self.instrument_id.to_le_bytes();
        for byte in seq
            .iter()
            .chain(ts.iter())
            .chain(mtype.iter())
            .chain(iid.iter())
            .chain(self.payload.iter())
        {
            acc ^= u16::from(*byte);
        }
        acc
    }

    #[must_use]
    pub fn checksum_valid(&self) -> bool {
        self.compute_checksum() == self.checksum
    }
}

/// Normalized market-data tick. 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub instrument: TreasuryType,
    _pad0: [u8; 7],
    pub ts: Ts,
    pub bid_price: Price32nd,
    pub ask_price: Price32nd,
    pub bid_size: u64,
    pub ask_size: u64,
    pub bid_yield: f64,
    pub ask_yield: f64,
}

const _: () = assert!(std::mem::size_of::<Tick>() == 64);

impl Tick {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        instrument: TreasuryType,
        ts: Ts,
        bid_price: Price32nd,
        ask_price: Price32nd,
        bid_size: u64,
        ask_size: u64,
        bid_yield: f64,
        ask_yield: f64,
    ) -> Self {
        Self {
            instrument,
            _pad0: [0; 7],
            ts,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            bid_yield,
            ask_yield,
        }
    }

    /// Valid iff both prices and both sizes are non-zero (§3.2).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.bid_price.whole > 0 && self.ask_price.whole > 0 && self.bid_size > 0 && self.ask_size > 0
    }
}

/// Normalized trade print. 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct Trade {
    pub instrument: TreasuryType,
    _pad0: [u8; 7],
    pub ts: Ts,
    pub price: Price32nd,
    pub size: u64,
    pub yield_value: f64,
    pub trade_id: [u8; 16],
    _pad1: [u8; 8],
}

const _: () = assert!(std::mem::size_of::<Trade>() == 64);

impl Trade {
    #[must_use]
    pub const fn new(
        instrument: TreasuryType,
        ts: Ts,
        price: Price32nd,
        size: u64,
        yield_value: f64,
        trade_id: [u8; 16],
    ) -> Self {
        Self {
            instrument,
            _pad0: [0; 7],
            ts,
            price,
            size,
            yield_value,
            trade_id,
            _pad1: [0; 8],
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.size > 0
    }
}

/// Order status, shared by the OMS's `Order` view and the venue simulator's
/// `VenueResponse` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OrderStatus {
    #[default]
    Acknowledged = 0,
    PartiallyFilled = 1,
    Filled = 2,
    Cancelled = 3,
    Rejected = 4,
}

/// Resting/working order as seen across the strategy/OMS/venue boundary.
/// 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy, Default)]
pub struct Order {
    pub order_id: u64,
    pub client_id: u64,
    pub ts_created: Ts,
    pub ts_venue: Ts,
    pub instrument: TreasuryType,
    pub order_type: OrderType,
    pub side: Side,
    pub status: OrderStatus,
    pub limit_price: Price32nd,
    pub yield_limit: f64,
    pub qty: u64,
    pub filled_qty: u64,
    pub remaining_qty: u64,
    pub venue_order_id: u64,
}

const _: () = assert!(std::mem::size_of::<Order>() <= 64);

impl Order {
    #[must_use]
    pub const fn invariant_holds(&self) -> bool {
        self.filled_qty + self.remaining_qty == self.qty
    }
}

/// Venue acknowledgment/fill/cancel/reject notification. 64 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct VenueResponse {
    pub order_id: u64,
    pub ts_venue: Ts,
    pub new_status: OrderStatus,
    _pad0: [u8; 7],
    pub fill_qty: u64,
    pub fill_price: Price32nd,
    pub venue_order_id: u64,
    pub reject_reason: [u8; 16],
}

const _: () = assert!(std::mem::size_of::<VenueResponse>() <= 64);

impl VenueResponse {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        order_id: u64,
        ts_venue: Ts,
        new_status: OrderStatus,
        fill_qty: u64,
        fill_price: Price32nd,
        venue_order_id: u64,
        reject_reason: [u8; 16],
    ) -> Self {
        Self {
            order_id,
            ts_venue,
            new_status,
            _pad0: [0; 7],
            fill_qty,
            fill_price,
            venue_order_id,
            reject_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> RawFrame {
        let mut frame = RawFrame {
            sequence: 42,
            exchange_ts_ns: 1_000,
            message_type: frame_type::TICK,
            instrument_id: 3,
            payload: [0u8; 32],
            checksum: 0,
            _padding: [0; 6],
        };
        frame.checksum = frame.compute_checksum();
        frame
    }

    #[test]
    fn checksum_round_trips() {
        let frame = sample_frame();
        assert!(frame.checksum_valid());
    }

    #[test]
    fn tampered_frame_fails_checksum() {
        let mut frame = sample_frame();
        frame.sequence += 1;
        assert!(!frame.checksum_valid());
    }

    #[test]
    fn raw_frame_is_64_bytes() {
        assert_eq!(std::mem::size_of::<RawFrame>(), 64);
    }

    #[test]
    fn tick_validity_requires_both_sides() {
        let ts = Ts::from_nanos(1);
        let valid = Tick::new(
            TreasuryType::Note10Y,
            ts,
            Price32nd::new(99, 16, 0),
            Price32nd::new(99, 17, 0),
            1_000_000,
            1_000_000,
            0.021,
            0.0209,
        );
        assert!(valid.is_valid());

        let zero_size = Tick::new(
            TreasuryType::Note10Y,
            ts,
            Price32nd::new(99, 16, 0),
            Price32nd::new(99, 17, 0),
            0,
            1_000_000,
            0.021,
            0.0209,
        );
        assert!(!zero_size.is_valid());
    }

    #[test]
    fn order_invariant_checks_qty_split() {
        let order = Order {
            order_id: 1,
            client_id: 1,
            ts_created: Ts::from_nanos(0),
            ts_venue: Ts::from_nanos(0),
            instrument: TreasuryType::Bill3M,
            order_type: OrderType::Limit,
            side: Side::Bid,
            status: OrderStatus::PartiallyFilled,
            limit_price: Price32nd::new(99, 0, 0),
            yield_limit: 0.0,
            qty: 100_000,
            filled_qty: 40_000,
            remaining_qty: 60_000,
            venue_order_id: 0,
        };
        assert!(order.invariant_holds());
    }
}
