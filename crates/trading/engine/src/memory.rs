//! C2 usage: a pre-allocated staging buffer for outbound wire orders,
//! avoiding a heap allocation per order on the hot path (§4.2, §6.5).

use common::Order;
use pool::{ObjectPool, PoolGuard};

pub const DEFAULT_STAGING_CAPACITY: usize = 4_096;

/// Thin wrapper around [`pool::ObjectPool`] sized for one
/// [`common::Order`] per in-flight submission. A strategy acquires a slot,
/// fills it in, and lets the guard drop once the order has been copied
/// into the OMS and handed to a venue.
pub struct OrderStagingPool {
    pool: ObjectPool<Order>,
}

impl OrderStagingPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { pool: ObjectPool::new(capacity) }
    }

    pub fn acquire(&self) -> Option<PoolGuard<'_, Order>> {
        self.pool.acquire()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    #[must_use]
    pub fn allocated(&self) -> usize {
        self.pool.allocated()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pool.is_exhausted()
    }
}

impl Default for OrderStagingPool {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_CAPACITY)
    }
}
