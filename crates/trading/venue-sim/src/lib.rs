//! C6: venue simulator — order admission, stochastic latency, and the fill
//! model a strategy trades against. One [`VenueSimulator`] represents a
//! single venue; [`VenueRouter`] aggregates up to 8 of them.

mod router;

pub use router::VenueRouter;

use common::{Clock, Order, OrderStatus, OrderType, Price32nd, Side, Tick, Ts, VenueResponse};
use rand::Rng;
use rand_distr::{Distribution, Normal};

pub const MAX_ACTIVE: usize = 4096;
pub const RESPONSE_RING_CAPACITY: usize = 8192;

pub const DEFAULT_BASE_LATENCY_NS: u64 = 50_000;
pub const DEFAULT_JITTER_STD_DEV_NS: f64 = 10_000.0;
pub const DEFAULT_QUEUE_DELAY_NS: u64 = 100_000;
pub const DEFAULT_QUEUE_PROBABILITY: f64 = 0.1;

/// Per-venue stochastic latency parameters (§4.6, §6.5).
#[derive(Debug, Clone, Copy)]
pub struct VenueParams {
    pub base_latency_ns: u64,
    pub jitter_std_dev_ns: f64,
    pub queue_delay_ns: u64,
    pub queue_probability: f64,
}

impl Default for VenueParams {
    fn default() -> Self {
        Self {
            base_latency_ns: DEFAULT_BASE_LATENCY_NS,
            jitter_std_dev_ns: DEFAULT_JITTER_STD_DEV_NS,
            queue_delay_ns: DEFAULT_QUEUE_DELAY_NS,
            queue_probability: DEFAULT_QUEUE_PROBABILITY,
        }
    }
}

struct ActiveOrder {
    order: Order,
}

fn reason_bytes(reason: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    let bytes = reason.as_bytes();
    let n = bytes.len().min(16);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Single simulated venue: order admission, a Gaussian+Bernoulli latency
/// model, and the response stream strategies consume.
pub struct VenueSimulator<R: Rng> {
    params: VenueParams,
    active_orders: Vec<ActiveOrder>,
    response_ring: ring::SpscRing<VenueResponse, RESPONSE_RING_CAPACITY>,
    next_venue_order_id: u64,
    rng: R,
}

impl<R: Rng> VenueSimulator<R> {
    #[must_use]
    pub fn new(params: VenueParams, rng: R) -> Self {
        Self {
            params,
            active_orders: Vec::with_capacity(MAX_ACTIVE),
            response_ring: ring::SpscRing::new(),
            next_venue_order_id: 1,
            rng,
        }
    }

    #[must_use]
    pub fn response_ring(&self) -> &ring::SpscRing<VenueResponse, RESPONSE_RING_CAPACITY> {
        &self.response_ring
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_orders.len()
    }

    fn sampled_latency_ns(&mut self) -> u64 {
        let normal = Normal::new(0.0, self.params.jitter_std_dev_ns).expect("valid std dev");
        let jitter = normal.sample(&mut self.rng);
        let queue_hit: f64 = self.rng.gen_range(0.0..1.0);
        let queue_add = if queue_hit < self.params.queue_probability {
            self.params.queue_delay_ns as f64
        } else {
            0.0
        };
        let total = self.params.base_latency_ns as f64 + jitter + queue_add;
        total.max(0.0) as u64
    }

    fn validate(order: &Order) -> Result<(), &'static str> {
        if !order.invariant_holds() {
            return Err("filled + remaining != qty");
        }
        match order.order_type {
            OrderType::Limit => {
                if order.limit_price.whole < 1 {
                    return Err("limit order whole price must be >= 1");
                }
            }
            OrderType::YieldLimit => {
                if order.yield_limit <= 0.0 {
                    return Err("yield-limit order must have positive yield");
                }
            }
            OrderType::Market | OrderType::Cancel => {}
            OrderType::Invalid => return Err("invalid order type"),
        }
        Ok(())
    }

    /// Admit an order. Always returns a response: `Acknowledged` scheduled
    /// at `now + sampled_latency()`, or an immediate `Rejected`.
    pub fn submit_order(&mut self, mut order: Order) -> VenueResponse {
        if let Err(reason) = Self::validate(&order) {
            return self.rejected(order.order_id, reason);
        }
        if self.active_orders.len() >= MAX_ACTIVE {
            return self.rejected(order.order_id, "Venue capacity exceeded");
        }

        let venue_order_id = self.next_venue_order_id;
        self.next_venue_order_id += 1;
        let latency = self.sampled_latency_ns();
        let ack_ts = Ts::from_nanos(Clock::now_ns() + latency);

        order.status = OrderStatus::Acknowledged;
        order.venue_order_id = venue_order_id;
        order.ts_venue = ack_ts;

        let response = VenueResponse {
            order_id: order.order_id,
            ts_venue: ack_ts,
            new_status: OrderStatus::Acknowledged,
            fill_qty: 0,
            fill_price: Price32nd::default(),
            venue_order_id,
            reject_reason: [0; 16],
        };

        self.active_orders.push(ActiveOrder { order });
        let _ = self.response_ring.try_push(response);
        response
    }

    fn rejected(&self, order_id: u64, reason: &str) -> VenueResponse {
        VenueResponse {
            order_id,
            ts_venue: Ts::from_nanos(Clock::now_ns()),
            new_status: OrderStatus::Rejected,
            fill_qty: 0,
            fill_price: Price32nd::default(),
            venue_order_id: 0,
            reject_reason: reason_bytes(reason),
        }
    }

    /// Cancel a resting order. Returns `false` if the order is unknown or
    /// already terminal.
    pub fn cancel_order(&mut self, order_id: u64) -> bool {
        let Some(active) = self
            .active_orders
            .iter_mut()
            .find(|a| a.order.order_id == order_id)
        else {
            return false;
        };

        if !matches!(active.order.status, OrderStatus::Acknowledged | OrderStatus::PartiallyFilled) {
            return false;
        }

        active.order.status = OrderStatus::Cancelled;
        let response = VenueResponse {
            order_id,
            ts_venue: Ts::from_nanos(Clock::now_ns()),
            new_status: OrderStatus::Cancelled,
            fill_qty: 0,
            fill_price: Price32nd::default(),
            venue_order_id: active.order.venue_order_id,
            reject_reason: [0; 16],
        };
        let _ = self.response_ring.try_push(response);
        true
    }

    fn fill_probability(order: &Order, bid: f64, ask: f64) -> f64 {
        match order.order_type {
            OrderType::Market => 0.95,
            _ => {
                let limit = order.limit_price.to_decimal();
                match order.side {
                    Side::Bid => {
                        if limit >= ask {
                            0.9
                        } else {
                            (0.9 - (ask - limit) * 0.1).max(0.0)
                        }
                    }
                    Side::Ask => {
                        if limit <= bid {
                            0.9
                        } else {
                            (0.9 - (limit - bid) * 0.1).max(0.0)
                        }
                    }
                }
            }
        }
    }

    fn fill_price(order: &Order, bid: f64, ask: f64, improvement: f64) -> Price32nd {
        match order.order_type {
            OrderType::Market => Price32nd::from_decimal(match order.side {
                Side::Bid => ask,
                Side::Ask => bid,
            }),
            _ => {
                let limit = order.limit_price.to_decimal();
                match order.side {
                    Side::Bid if limit >= ask => Price32nd::from_decimal(ask - improvement),
                    Side::Ask if limit <= bid => Price32nd::from_decimal(bid + improvement),
                    _ => order.limit_price,
                }
            }
        }
    }

    /// Evaluate every resting order against one market update, publishing
    /// fill/partial-fill responses. Returns the number of fills applied.
    /// Terminal orders (filled/cancelled/rejected) are compacted out after.
    pub fn process_market_update(&mut self, tick: &Tick) -> usize {
        let bid = tick.bid_price.to_decimal();
        let ask = tick.ask_price.to_decimal();
        let mut fills = 0usize;

        for active in &mut self.active_orders {
            if !matches!(active.order.status, OrderStatus::Acknowledged | OrderStatus::PartiallyFilled) {
                continue;
            }

            let prob = Self::fill_probability(&active.order, bid, ask);
            let coin: f64 = self.rng.gen_range(0.0..1.0);
            if coin >= prob {
                continue;
            }

            let u: f64 = self.rng.gen_range(0.0..1.0);
            let remaining = active.order.remaining_qty;
            let fill_qty = if u < prob {
                remaining
            } else {
                (1u64).max(((remaining as f64) * prob * u).floor() as u64)
            }
            .min(remaining);

            if fill_qty == 0 {
                continue;
            }

            let improvement: f64 = self.rng.gen_range(0.0..1.0 / 32.0);
            let price = Self::fill_price(&active.order, bid, ask, improvement);

            active.order.filled_qty += fill_qty;
            active.order.remaining_qty -= fill_qty;
            let new_status = if active.order.remaining_qty == 0 {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            active.order.status = new_status;

            let response = VenueResponse {
                order_id: active.order.order_id,
                ts_venue: Ts::from_nanos(Clock::now_ns()),
                new_status,
                fill_qty,
                fill_price: price,
                venue_order_id: active.order.venue_order_id,
                reject_reason: [0; 16],
            };
            let _ = self.response_ring.try_push(response);
            fills += 1;
        }

        self.active_orders
            .retain(|a| !matches!(a.order.status, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected));

        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TreasuryType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn new_order(id: u64, side: Side, order_type: OrderType, limit: Price32nd, qty: u64) -> Order {
        Order {
            order_id: id,
            client_id: 1,
            ts_created: Ts::from_nanos(0),
            ts_venue: Ts::from_nanos(0),
            instrument: TreasuryType::Note10Y,
            order_type,
            side,
            status: OrderStatus::Acknowledged,
            limit_price: limit,
            yield_limit: 0.0,
            qty,
            filled_qty: 0,
            remaining_qty: qty,
            venue_order_id: 0,
        }
    }

    fn sim() -> VenueSimulator<StdRng> {
        VenueSimulator::new(VenueParams::default(), StdRng::seed_from_u64(42))
    }

    #[test]
    fn admission_acknowledges_valid_order() {
        let mut venue = sim();
        let order = new_order(1, Side::Bid, OrderType::Market, Price32nd::default(), 1_000_000);
        let response = venue.submit_order(order);
        assert_eq!(response.new_status, OrderStatus::Acknowledged);
        assert_eq!(venue.active_count(), 1);
    }

    #[test]
    fn zero_price_limit_order_is_rejected() {
        let mut venue = sim();
        let order = new_order(1, Side::Bid, OrderType::Limit, Price32nd::new(0, 0, 0), 1_000_000);
        let response = venue.submit_order(order);
        assert_eq!(response.new_status, OrderStatus::Rejected);
        assert_eq!(venue.active_count(), 0);
    }

    #[test]
    fn capacity_exceeded_rejects_new_orders() {
        let mut venue = sim();
        for i in 0..MAX_ACTIVE as u64 {
            let order = new_order(i + 1, Side::Bid, OrderType::Market, Price32nd::default(), 1_000_000);
            assert_eq!(venue.submit_order(order).new_status, OrderStatus::Acknowledged);
        }
        let overflow = new_order(9999, Side::Bid, OrderType::Market, Price32nd::default(), 1_000_000);
        assert_eq!(venue.submit_order(overflow).new_status, OrderStatus::Rejected);
    }

    #[test]
    fn cancel_unknown_order_returns_false() {
        let mut venue = sim();
        assert!(!venue.cancel_order(12345));
    }

    #[test]
    fn cancel_resting_order_schedules_response() {
        let mut venue = sim();
        let order = new_order(1, Side::Bid, OrderType::Market, Price32nd::default(), 1_000_000);
        venue.submit_order(order);
        assert!(venue.cancel_order(1));
        assert!(!venue.cancel_order(1), "already terminal");
    }

    #[test]
    fn market_order_eventually_fills_against_updates() {
        let mut venue = sim();
        let order = new_order(1, Side::Bid, OrderType::Market, Price32nd::default(), 1_000_000);
        venue.submit_order(order);

        let tick = Tick::new(
            TreasuryType::Note10Y,
            Ts::from_nanos(1),
            Price32nd::new(99, 16, 0),
            Price32nd::new(99, 17, 0),
            5_000_000,
            5_000_000,
            0.02,
            0.02,
        );

        let mut total_fills = 0;
        for _ in 0..50 {
            total_fills += venue.process_market_update(&tick);
            if venue.active_count() == 0 {
                break;
            }
        }
        assert!(total_fills > 0, "market order at 0.95 fill prob should fill within 50 ticks");
        assert_eq!(venue.active_count(), 0, "filled orders are compacted out");
    }

    #[test]
    fn remaining_never_goes_negative() {
        let mut venue = sim();
        let order = new_order(1, Side::Ask, OrderType::Limit, Price32nd::new(98, 0, 0), 10);
        venue.submit_order(order);
        let tick = Tick::new(
            TreasuryType::Note10Y,
            Ts::from_nanos(1),
            Price32nd::new(99, 0, 0),
            Price32nd::new(99, 5, 0),
            1_000_000,
            1_000_000,
            0.02,
            0.02,
        );
        for _ in 0..200 {
            venue.process_market_update(&tick);
        }
    }
}
