//! §6.5 tunables for the two risk layers. Every field is a `Default`-deriving
//! struct field; nothing here reads configuration files or the environment.

/// Layer 1 hard-limit thresholds (§4.7, budget <= 50 ns).
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub max_position_per_instrument: i64,
    pub max_total_position: i64,
    pub max_daily_loss: i64,
    pub max_orders_per_second: u32,
    pub max_messages_per_second: u32,
    pub max_order_size: u64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_per_instrument: 100_000_000,
            max_total_position: 500_000_000,
            max_daily_loss: 1_000_000,
            max_orders_per_second: 1_000,
            max_messages_per_second: 10_000,
            max_order_size: 50_000_000,
        }
    }
}

/// Layer 2 enhanced-check thresholds (§4.7, budget <= 400 ns).
#[derive(Debug, Clone, Copy)]
pub struct EnhancedLimits {
    pub dv01_limit: f64,
    pub concentration_limit: f64,
    pub correlation_limit: f64,
    pub var_limit: f64,
    pub stress_loss_limit: f64,
}

impl Default for EnhancedLimits {
    fn default() -> Self {
        Self {
            dv01_limit: 50_000.0,
            concentration_limit: 0.6,
            correlation_limit: 0.8,
            var_limit: 2_000_000.0,
            stress_loss_limit: 5_000_000.0,
        }
    }
}

/// Volatility breaker threshold; not named in §6.5's enumerated table but
/// required to evaluate the `Volatility` breaker class (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct VolatilityLimits {
    pub max_price_volatility: f64,
}

impl Default for VolatilityLimits {
    fn default() -> Self {
        Self {
            max_price_volatility: 0.05,
        }
    }
}
