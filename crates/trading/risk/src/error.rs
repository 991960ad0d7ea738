//! §7 error taxonomy entries this crate is responsible for surfacing.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RiskError {
    #[error("a circuit breaker is active; orders are rejected until reset")]
    BreakerTripped,
    #[error("emergency stop is active; all new orders are refused")]
    EmergencyStop,
}
