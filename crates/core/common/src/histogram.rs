//! C1: lock-free latency histogram with logarithmic (base-2 width) bins.

use std::sync::atomic::{AtomicU64, Ordering};

const NUM_BINS: usize = 1024;

/// Cache-aligned, atomically-updated latency histogram.
///
/// Samples are bucketed by `floor(log2(ns))`, matching the original
/// implementation's logarithmic binning. Min/max/count/sum/sum-of-squares
/// are tracked alongside the bins so [`LatencyHistogram::get_stats`] can
/// derive mean and standard deviation without rescanning every sample.
#[repr(C, align(64))]
pub struct LatencyHistogram {
    bins: Box<[AtomicU64; NUM_BINS]>,
    total_samples: AtomicU64,
    min_latency_ns: AtomicU64,
    max_latency_ns: AtomicU64,
    sum_latency_ns: AtomicU64,
    sum_squared_latency_ns: AtomicU64,
}

impl LatencyHistogram {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bins: Box::new(std::array::from_fn(|_| AtomicU64::new(0))),
            total_samples: AtomicU64::new(0),
            min_latency_ns: AtomicU64::new(u64::MAX),
            max_latency_ns: AtomicU64::new(0),
            sum_latency_ns: AtomicU64::new(0),
            sum_squared_latency_ns: AtomicU64::new(0),
        }
    }

    #[inline]
    fn bin_index(ns: u64) -> usize {
        if ns == 0 {
            0
        } else {
            (63 - ns.leading_zeros() as usize).min(NUM_BINS - 1)
        }
    }

    /// Record one latency sample, in nanoseconds.
    pub fn record_latency(&self, ns: u64) {
        self.bins[Self::bin_index(ns)].fetch_add(1, Ordering::Relaxed);
        self.total_samples.fetch_add(1, Ordering::Relaxed);
        self.sum_latency_ns.fetch_add(ns, Ordering::Relaxed);
        self.sum_squared_latency_ns
            .fetch_add(ns.saturating_mul(ns), Ordering::Relaxed);
        self.min_latency_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_latency_ns.fetch_max(ns, Ordering::Relaxed);
    }

    /// Snapshot statistics: min/max/mean/stddev and p50/p90/p95/p99.
    #[must_use]
    pub fn get_stats(&self) -> LatencyStats {
        let total = self.total_samples.load(Ordering::Acquire);
        if total == 0 {
            return LatencyStats::default();
        }

        let sum = self.sum_latency_ns.load(Ordering::Acquire) as f64;
        let sum_sq = self.sum_squared_latency_ns.load(Ordering::Acquire) as f64;
        let n = total as f64;
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0);

        const TARGETS: [f64; 4] = [0.50, 0.90, 0.95, 0.99];
        let mut percentiles_ns = [0u64; 4];
        let mut target_idx = 0usize;
        let mut cumulative = 0u64;
        for (bin, counter) in self.bins.iter().enumerate() {
            cumulative += counter.load(Ordering::Acquire);
            while target_idx < TARGETS.len() && cumulative as f64 >= TARGETS[target_idx] * n {
                percentiles_ns[target_idx] = 1u64 << bin;
                target_idx += 1;
            }
            if target_idx == TARGETS.len() {
                break;
            }
        }

        LatencyStats {
            min_latency_ns: self.min_latency_ns.load(Ordering::Acquire),
            max_latency_ns: self.max_latency_ns.load(Ordering::Acquire),
            mean_latency_ns: mean,
            std_dev_ns: variance.sqrt(),
            percentiles_ns,
            total_samples: total,
        }
    }

    /// Zero every counter. Non-blocking; concurrent recorders may race with
    /// a reset and lose a sample, which is acceptable for a stats surface.
    pub fn reset(&self) {
        for bin in self.bins.iter() {
            bin.store(0, Ordering::Relaxed);
        }
        self.total_samples.store(0, Ordering::Relaxed);
        self.min_latency_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_latency_ns.store(0, Ordering::Relaxed);
        self.sum_latency_ns.store(0, Ordering::Relaxed);
        self.sum_squared_latency_ns.store(0, Ordering::Relaxed);
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a [`LatencyHistogram`] at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub min_latency_ns: u64,
    pub max_latency_ns: u64,
    pub mean_latency_ns: f64,
    pub std_dev_ns: f64,
    /// p50, p90, p95, p99 in that order.
    pub percentiles_ns: [u64; 4],
    pub total_samples: u64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            min_latency_ns: 0,
            max_latency_ns: 0,
            mean_latency_ns: 0.0,
            std_dev_ns: 0.0,
            percentiles_ns: [0; 4],
            total_samples: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_zero_stats() {
        let h = LatencyHistogram::new();
        let stats = h.get_stats();
        assert_eq!(stats.total_samples, 0);
        assert_eq!(stats.min_latency_ns, 0);
    }

    #[test]
    fn records_min_max_and_count() {
        let h = LatencyHistogram::new();
        for ns in [100, 200, 50, 1000] {
            h.record_latency(ns);
        }
        let stats = h.get_stats();
        assert_eq!(stats.total_samples, 4);
        assert_eq!(stats.min_latency_ns, 50);
        assert_eq!(stats.max_latency_ns, 1000);
        assert!(stats.mean_latency_ns > 0.0);
    }

    #[test]
    fn reset_zeroes_everything() {
        let h = LatencyHistogram::new();
        h.record_latency(42);
        h.reset();
        let stats = h.get_stats();
        assert_eq!(stats.total_samples, 0);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let h = LatencyHistogram::new();
        for ns in 1..=1000u64 {
            h.record_latency(ns);
        }
        let stats = h.get_stats();
        let [p50, p90, p95, p99] = stats.percentiles_ns;
        assert!(p50 <= p90);
        assert!(p90 <= p95);
        assert!(p95 <= p99);
    }
}
