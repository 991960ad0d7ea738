//! Bridges C7 (risk), C8 (OMS), and C6 (venue router): translates between
//! the OMS's internal [`OrderRecord`] and the wire [`common::Order`] the
//! venue simulator and strategy boundary both understand, and applies
//! venue responses back onto the OMS and position reconciliation.

use common::{Order as WireOrder, OrderStatus as WireOrderStatus, OrderType, Price32nd, Side, Tick, TreasuryType};
use oms::{OlmConfig, OrderLifecycleManager, OrderRecord, TimeInForce};
use rand::Rng;
use reconciliation::PositionReconciliationManager;
use risk::{EnhancedLimits, RiskController, RiskLimits, VolatilityLimits};
use venue_sim::VenueRouter;

fn to_wire_order(record: &OrderRecord) -> WireOrder {
    WireOrder {
        order_id: record.order_id,
        client_id: record.client_id,
        ts_created: record.ts_created,
        ts_venue: record.ts_venue,
        instrument: record.instrument,
        order_type: record.order_type,
        side: record.side,
        status: WireOrderStatus::Acknowledged,
        limit_price: record.limit_price,
        yield_limit: record.yield_limit,
        qty: record.qty,
        filled_qty: record.filled_qty,
        remaining_qty: record.remaining_qty,
        venue_order_id: record.venue_order_id,
    }
}

/// Owns the risk gate, the order lifecycle manager, and the venue router,
/// and wires the three together the way §4.8's "create -> route -> submit"
/// and "response -> apply -> reconcile" flows describe.
pub struct ExecutionLayer<R: Rng> {
    risk: RiskController,
    risk_limits: RiskLimits,
    olm: OrderLifecycleManager,
    router: VenueRouter<R>,
}

impl<R: Rng> ExecutionLayer<R> {
    #[must_use]
    pub fn new(risk_limits: RiskLimits, enhanced_limits: EnhancedLimits, volatility_limits: VolatilityLimits, olm_config: OlmConfig, router: VenueRouter<R>) -> Self {
        Self {
            risk: RiskController::new(risk_limits, enhanced_limits, volatility_limits),
            risk_limits,
            olm: OrderLifecycleManager::new(olm_config),
            router,
        }
    }

    #[must_use]
    pub fn risk(&self) -> &RiskController {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskController {
        &mut self.risk
    }

    #[must_use]
    pub fn risk_limits(&self) -> RiskLimits {
        self.risk_limits
    }

    #[must_use]
    pub fn olm(&self) -> &OrderLifecycleManager {
        &self.olm
    }

    /// Feed one market update to every venue's fill simulation (C6).
    pub fn process_market_update(&mut self, tick: &Tick) {
        for idx in 0..self.router.venue_count() {
            if let Some(venue) = self.router.venue_mut(idx) {
                venue.process_market_update(tick);
            }
        }
    }

    /// Create, risk-gate, route, and submit an order in one call. Returns
    /// `0` on any rejection along the way (§4.8).
    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(&mut self, instrument: TreasuryType, side: Side, order_type: OrderType, limit_price: Price32nd, yield_limit: f64, qty: u64, tif: TimeInForce, now_ns: u64) -> u64 {
        let order_id = self.olm.create_order(&self.risk, instrument, side, order_type, limit_price, yield_limit, qty, tif, now_ns);
        if order_id == 0 {
            return 0;
        }

        let Some(venue_idx) = self.olm.route_order(order_id, now_ns) else {
            self.olm.reject_order(order_id, "no venue available", now_ns);
            return 0;
        };

        let Some(record) = self.olm.get_order(order_id) else {
            return 0;
        };

        let Some(venue) = self.router.venue_mut(venue_idx as usize) else {
            self.olm.reject_order(order_id, "venue index out of range", now_ns);
            return 0;
        };

        self.olm.mark_pending_new(order_id, now_ns);
        let response = venue.submit_order(to_wire_order(&record));

        if response.new_status == WireOrderStatus::Acknowledged {
            self.olm.apply_ack(order_id, response.venue_order_id, now_ns);
            let delta = match side {
                Side::Bid => qty as i64,
                Side::Ask => -(qty as i64),
            };
            self.risk.update_layer1_state(instrument, delta, 0, now_ns);
        } else {
            self.olm.reject_order(order_id, "venue rejected", now_ns);
        }

        order_id
    }

    /// Request a cancel and forward it to the order's routed venue.
    pub fn request_cancel(&mut self, order_id: u64, now_ns: u64) -> bool {
        if !self.olm.request_cancel(order_id, now_ns) {
            return false;
        }
        let Some(record) = self.olm.get_order(order_id) else {
            return false;
        };
        let Some(venue) = self.router.venue_mut(record.target_venue as usize) else {
            return false;
        };
        venue.cancel_order(order_id)
    }

    /// Drain every venue's responses through the consolidated ring (§4.6)
    /// and apply each one to the OMS, posting fills into `position` (§4.9).
    /// Returns the number of responses applied.
    pub fn pump_fills(&mut self, position: &mut PositionReconciliationManager, now_ns: u64) -> usize {
        self.router.process_venue_responses();
        let mut applied = 0usize;

        while let Some(response) = self.router.consolidated_ring().try_pop() {
            applied += 1;
            let Some(record) = self.olm.get_order(response.order_id) else {
                continue;
            };

            match response.new_status {
                WireOrderStatus::Filled | WireOrderStatus::PartiallyFilled => {
                    let venue = record.target_venue as usize;
                    self.olm.process_fill(response.order_id, response.fill_qty, response.fill_price, 0.0, now_ns);

                    let realized_before = position.position(record.instrument, venue).map_or(0.0, |p| p.realized_pnl);
                    if position
                        .update_position(record.instrument, venue, record.side, response.fill_qty, response.fill_price, response.order_id, now_ns)
                        .is_err()
                    {
                        tracing::warn!(order_id = response.order_id, venue, "fill applied against an unknown venue index");
                        continue;
                    }
                    let realized_after = position.position(record.instrument, venue).map_or(0.0, |p| p.realized_pnl);
                    let realized_delta = (realized_after - realized_before).round() as i64;
                    self.risk.update_layer1_state(record.instrument, 0, realized_delta, now_ns);
                }
                WireOrderStatus::Cancelled => {
                    self.olm.apply_cancel(response.order_id, now_ns);
                }
                WireOrderStatus::Rejected => {
                    self.olm.reject_order(response.order_id, "venue rejected post-ack", now_ns);
                }
                WireOrderStatus::Acknowledged => {
                    self.olm.apply_ack(response.order_id, response.venue_order_id, now_ns);
                }
            }
        }

        applied
    }

    /// Latch the emergency-stop flag on both the risk gate and the OMS
    /// (§4.8 "Emergency stop").
    pub fn emergency_stop(&mut self, now_ns: u64) {
        self.risk.activate_emergency_halt();
        self.olm.emergency_stop_all(now_ns);
    }

    pub fn reset_daily(&mut self, now_ns: u64) {
        self.risk.reset_daily(now_ns);
    }
}
