//! Per-instrument volatility tracking (§4.7): a circular buffer of the last
//! [`WINDOW`] mid prices, feeding the sample standard deviation of one-step
//! returns into the `Volatility` breaker.

pub const WINDOW: usize = 1000;

pub struct VolatilityTracker {
    mids: Box<[f64; WINDOW]>,
    index: usize,
    filled: usize,
}

impl VolatilityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mids: Box::new([0.0; WINDOW]),
            index: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, mid_price: f64) {
        self.mids[self.index] = mid_price;
        self.index = (self.index + 1) % WINDOW;
        self.filled = (self.filled + 1).min(WINDOW);
    }

    /// Sample standard deviation of one-step returns over the filled window.
    /// `0.0` until at least two samples are present.
    #[must_use]
    pub fn returns_std_dev(&self) -> f64 {
        if self.filled < 2 {
            return 0.0;
        }
        let start = (self.index + WINDOW - self.filled) % WINDOW;
        let mut returns = Vec::with_capacity(self.filled - 1);
        let mut prev = self.mids[start];
        for i in 1..self.filled {
            let cur = self.mids[(start + i) % WINDOW];
            if prev != 0.0 {
                returns.push((cur - prev) / prev);
            }
            prev = cur;
        }
        if returns.len() < 2 {
            return 0.0;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    }
}

impl Default for VolatilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_price_has_zero_volatility() {
        let mut v = VolatilityTracker::new();
        for _ in 0..10 {
            v.push(100.0);
        }
        assert_eq!(v.returns_std_dev(), 0.0);
    }

    #[test]
    fn oscillating_price_has_nonzero_volatility() {
        let mut v = VolatilityTracker::new();
        for i in 0..20 {
            v.push(if i % 2 == 0 { 100.0 } else { 101.0 });
        }
        assert!(v.returns_std_dev() > 0.0);
    }

    #[test]
    fn window_wraps_without_panicking() {
        let mut v = VolatilityTracker::new();
        for i in 0..(WINDOW * 3) {
            v.push(100.0 + (i % 7) as f64 * 0.01);
        }
        assert!(v.returns_std_dev() >= 0.0);
    }
}
