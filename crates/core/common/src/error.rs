//! Shared error taxonomy for cross-cutting concerns (§7).
//!
//! Components with richer failure modes (feed handling, risk checks, order
//! lifecycle, reconciliation) define their own `thiserror` enums and wrap
//! this one where a lower layer's failure needs to surface through.

use thiserror::Error;

/// Errors that can originate from the core primitives crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("capacity exhausted: {what} ({capacity} slots)")]
    CapacityExhausted { what: &'static str, capacity: usize },

    #[error("unknown instrument id: {0}")]
    UnknownInstrument(u32),

    #[error("value out of range: {what} = {value}")]
    OutOfRange { what: &'static str, value: i64 },
}
