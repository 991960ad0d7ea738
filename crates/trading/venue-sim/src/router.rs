//! Venue routing aggregator: round-robin dispatch across up to [`MAX_VENUES`]
//! venues, draining each venue's response ring into one consolidated ring
//! that strategies read from (§4.6 "Routing aggregator").

use crate::VenueSimulator;
use common::{Order, VenueResponse};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const MAX_VENUES: usize = 8;
pub const CONSOLIDATED_RING_CAPACITY: usize = 16_384;

/// Aggregates up to [`MAX_VENUES`] [`VenueSimulator`]s behind a single
/// round-robin `route_order` entry point and one consolidated response ring.
pub struct VenueRouter<R: Rng> {
    venues: Vec<VenueSimulator<R>>,
    next_venue: AtomicUsize,
    consolidated: ring::SpscRing<VenueResponse, CONSOLIDATED_RING_CAPACITY>,
}

impl<R: Rng> VenueRouter<R> {
    /// Build a router over `venues` (at most [`MAX_VENUES`]; extras are
    /// dropped, matching the "holds up to 8 venues" contract).
    #[must_use]
    pub fn new(mut venues: Vec<VenueSimulator<R>>) -> Self {
        venues.truncate(MAX_VENUES);
        Self {
            venues,
            next_venue: AtomicUsize::new(0),
            consolidated: ring::SpscRing::new(),
        }
    }

    #[must_use]
    pub fn venue_count(&self) -> usize {
        self.venues.len()
    }

    #[must_use]
    pub fn consolidated_ring(&self) -> &ring::SpscRing<VenueResponse, CONSOLIDATED_RING_CAPACITY> {
        &self.consolidated
    }

    /// Pick the next venue round-robin and submit. Returns `None` if no
    /// venue is registered.
    pub fn route_order(&mut self, order: Order) -> Option<VenueResponse> {
        if self.venues.is_empty() {
            return None;
        }
        let idx = self.next_venue.fetch_add(1, Ordering::Relaxed) % self.venues.len();
        Some(self.venues[idx].submit_order(order))
    }

    /// Mutable access to a venue by index, for feeding market updates or
    /// issuing cancels against a specific venue.
    pub fn venue_mut(&mut self, idx: usize) -> Option<&mut VenueSimulator<R>> {
        self.venues.get_mut(idx)
    }

    /// Drain every venue's response ring into the consolidated ring. Returns
    /// the total number of responses moved.
    pub fn process_venue_responses(&mut self) -> usize {
        let mut moved = 0usize;
        for venue in &mut self.venues {
            while let Some(response) = venue.response_ring().try_pop() {
                if self.consolidated.try_push(response) {
                    moved += 1;
                } else {
                    break;
                }
            }
        }
        moved
    }
}
