//! Nanosecond-budget benchmarks for the components with explicit latency
//! contracts in the spec: the object pool and SPSC ring (§4.2, §4.3), and
//! the risk controller's two layers (§4.7, budgets <= 50 ns / <= 400 ns).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::{Side, TreasuryType};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pool::ObjectPool;
use ring::SpscRing;
use risk::{EnhancedLimits, RiskController, RiskLimits, VolatilityLimits};

fn bench_object_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("object_pool");

    #[derive(Default)]
    struct Slot {
        _data: [u64; 8],
    }

    group.bench_function("acquire_release", |b| {
        let mut pool: ObjectPool<Slot> = ObjectPool::new(1024);
        b.iter(|| {
            if let Some(guard) = pool.acquire() {
                black_box(&*guard);
            }
        });
    });

    group.finish();
}

fn bench_spsc_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_ring");

    group.bench_function("push_pop_u64", |b| {
        let ring: SpscRing<u64, 1024> = SpscRing::new();
        let mut next = 0u64;
        b.iter(|| {
            ring.try_push(black_box(next));
            next += 1;
            black_box(ring.try_pop());
        });
    });

    group.finish();
}

fn bench_risk_layer1(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_layer1");

    group.bench_function("check_layer1", |b| {
        let controller = RiskController::new(RiskLimits::default(), EnhancedLimits::default(), VolatilityLimits::default());
        b.iter(|| {
            black_box(controller.check_layer1(black_box(TreasuryType::Note10Y), black_box(Side::Bid), black_box(1_000_000), black_box(1)));
        });
    });

    group.finish();
}

fn bench_risk_layer2(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_layer2");

    group.bench_function("check_comprehensive", |b| {
        let mut controller = RiskController::new(RiskLimits::default(), EnhancedLimits::default(), VolatilityLimits::default());
        controller.update_layer2_state(10_000.0, 0.2, 0.1, 500_000.0, 1_000_000.0);
        b.iter(|| {
            black_box(controller.check_comprehensive(black_box(TreasuryType::Note10Y), black_box(Side::Bid), black_box(1_000_000), black_box(true), black_box(1)));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_object_pool, bench_spsc_ring, bench_risk_layer1, bench_risk_layer2);
criterion_main!(benches);
