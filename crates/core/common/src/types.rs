//! Small value types shared across the ingress/execution boundary.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};

/// Which side of the book an order or tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Side {
    #[default]
    Bid = 0,
    Ask = 1,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

/// Order instruction kind understood by the order intake surface (§6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum OrderType {
    #[default]
    Limit = 0,
    YieldLimit = 1,
    Market = 2,
    Cancel = 3,
    /// Sentinel for a malformed or unrecognized instruction; never routed.
    Invalid = 255,
}

impl OrderType {
    #[must_use]
    pub const fn from_wire(tag: u8) -> Self {
        match tag {
            0 => Self::Limit,
            1 => Self::YieldLimit,
            2 => Self::Market,
            3 => Self::Cancel,
            _ => Self::Invalid,
        }
    }
}

/// Nanosecond timestamp, monotonic within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Ts(pub u64);

impl Ts {
    #[must_use]
    pub fn now() -> Self {
        Self(Clock::now_ns())
    }

    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_is_involutive() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite().opposite(), Side::Ask);
    }

    #[test]
    fn order_type_from_wire_unknown_is_invalid() {
        assert_eq!(OrderType::from_wire(0), OrderType::Limit);
        assert_eq!(OrderType::from_wire(3), OrderType::Cancel);
        assert_eq!(OrderType::from_wire(42), OrderType::Invalid);
    }

    #[test]
    fn ts_bincode_round_trip() {
        let ts = Ts::from_nanos(123_456_789);
        let bytes = bincode::serialize(&ts).expect("serialize");
        let back: Ts = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(ts, back);
    }

    #[test]
    fn ts_now_is_monotonic_enough() {
        let a = Ts::now();
        let b = Ts::now();
        assert!(b >= a);
    }
}
