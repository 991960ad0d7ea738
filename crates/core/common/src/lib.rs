//! Core primitives shared by every stage of the tick-to-trade core:
//! the high-resolution clock (C1), the Treasury instrument model (C4),
//! and the small set of value types that cross component boundaries.
#![deny(unsafe_op_in_unsafe_fn)]

mod clock;
mod error;
mod histogram;
mod instrument;
mod price;
mod records;
mod types;

pub use clock::{Clock, ScopedTimer};
pub use error::CoreError;
pub use histogram::{LatencyHistogram, LatencyStats};
pub use instrument::{TreasuryInstrument, TreasuryType, YieldCalculator, NUM_INSTRUMENTS};
pub use price::Price32nd;
pub use records::{frame_type, Order, OrderStatus, RawFrame, Tick, Trade, VenueResponse};
pub use types::{OrderType, Side, Ts};
