//! §7 error taxonomy entries this crate is responsible for surfacing.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    #[error("quantity violates the instrument's minimum/increment rule")]
    InvalidQuantity,
    #[error("price or quantity must be positive")]
    InvalidValue,
    #[error("no free order slot after probing the whole table")]
    CapacityExhausted,
    #[error("order id not found")]
    UnknownOrder,
    #[error("order is not in a state that permits this transition")]
    InvalidTransition,
    #[error("emergency stop is active; new orders are refused")]
    EmergencyStop,
}
