//! §7 error taxonomy entries this crate is responsible for surfacing.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("venue index out of range")]
    UnknownVenue,
    #[error("break id not found")]
    UnknownBreak,
    #[error("position-history ring is empty")]
    NoHistory,
}
