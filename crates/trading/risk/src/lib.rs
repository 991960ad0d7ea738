//! C7: real-time risk control. Layer 1 hard limits run on every order;
//! Layer 2 enhanced checks run when a caller opts in. Both feed into a
//! shared set of latching circuit breakers and a global emergency-stop flag
//! (§4.7).

mod breaker;
mod controller;
mod error;
mod limits;
mod rate;
mod volatility;

pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerType, Severity, NUM_BREAKER_TYPES};
pub use controller::RiskController;
pub use error::RiskError;
pub use limits::{EnhancedLimits, RiskLimits, VolatilityLimits};
