//! C1: monotonic cycle clock with one-time ns calibration.
//!
//! `cycles()` reads a hardware counter (TSC on x86_64, a monotonic
//! nanosecond fallback elsewhere). `cycles_to_ns` converts using a
//! scale factor computed once by [`Clock::calibrate`] and stored behind
//! a release store; all subsequent reads acquire-load it.

use crate::histogram::LatencyHistogram;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static CYCLES_PER_NS_BITS: AtomicU64 = AtomicU64::new(0);

#[cfg(not(target_arch = "x86_64"))]
static FALLBACK_EPOCH: OnceLock<Instant> = OnceLock::new();

#[inline(always)]
fn read_cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: RDTSC is available on every x86_64 target this workspace builds for.
        unsafe { std::arch::x86_64::_rdtsc() }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        let epoch = FALLBACK_EPOCH.get_or_init(Instant::now);
        epoch.elapsed().as_nanos() as u64
    }
}

/// High-resolution clock. Stateless handle; calibration state is process-global.
pub struct Clock;

impl Clock {
    /// Measure the counter's rate against the wall clock once. Idempotent;
    /// later calls are no-ops once a ratio has been published.
    pub fn calibrate() {
        if CYCLES_PER_NS_BITS.load(Ordering::Acquire) != 0 {
            return;
        }
        let start_cycles = read_cycles();
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        let elapsed_ns = start.elapsed().as_nanos() as f64;
        let elapsed_cycles = read_cycles().saturating_sub(start_cycles) as f64;
        let ratio = if elapsed_cycles > 0.0 {
            elapsed_cycles / elapsed_ns
        } else {
            1.0
        };
        CYCLES_PER_NS_BITS.store(ratio.to_bits(), Ordering::Release);
    }

    /// Raw monotonic cycle count.
    #[inline(always)]
    #[must_use]
    pub fn cycles() -> u64 {
        read_cycles()
    }

    /// Convert a cycle delta to nanoseconds using the calibrated ratio.
    /// Falls back to a 1:1 ratio if `calibrate` has not run yet.
    #[inline(always)]
    #[must_use]
    pub fn cycles_to_ns(cycles: u64) -> u64 {
        let bits = CYCLES_PER_NS_BITS.load(Ordering::Acquire);
        let ratio = if bits == 0 { 1.0 } else { f64::from_bits(bits) };
        (cycles as f64 / ratio) as u64
    }

    /// Monotonic nanoseconds since an arbitrary epoch.
    #[inline(always)]
    #[must_use]
    pub fn now_ns() -> u64 {
        Self::cycles_to_ns(Self::cycles())
    }
}

/// RAII scope timer: records elapsed nanoseconds into a histogram on drop.
pub struct ScopedTimer<'a> {
    start_cycles: u64,
    histogram: &'a LatencyHistogram,
}

impl<'a> ScopedTimer<'a> {
    #[must_use]
    pub fn new(histogram: &'a LatencyHistogram) -> Self {
        Self {
            start_cycles: Clock::cycles(),
            histogram,
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = Clock::cycles().saturating_sub(self.start_cycles);
        self.histogram.record_latency(Clock::cycles_to_ns(elapsed));
    }
}
