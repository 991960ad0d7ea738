//! C3: lock-free SPSC ring for single-producer/single-consumer record
//! handoff between pipeline stages.
//!
//! `N` must be a power of two. One slot is always reserved so `head == tail`
//! unambiguously means empty; effective capacity is `N - 1`. The producer
//! publishes with a release store on `tail` after the payload write; the
//! consumer acquire-loads `tail` before reading the payload and release-
//! stores `head` after. Head and tail live on separate cache lines so
//! producer and consumer never contend on the same line.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

#[repr(C, align(64))]
struct Head {
    value: AtomicUsize,
    _pad: [u8; 56],
}

#[repr(C, align(64))]
struct Tail {
    value: AtomicUsize,
    _pad: [u8; 56],
}

/// SPSC ring buffer of capacity `N` (power of two), holding `N - 1` live
/// records. `T` must be plain-copy record data: no producer/consumer keeps
/// a reference into the ring, values move by copy.
pub struct SpscRing<T, const N: usize> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>; N]>,
    head: Head,
    tail: Tail,
}

// SAFETY: exactly one producer and one consumer are expected to hold
// references across threads; the protocol below is the standard SPSC
// acquire/release handoff.
unsafe impl<T: Send, const N: usize> Send for SpscRing<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T, const N: usize> SpscRing<T, N> {
    const MASK: usize = {
        assert!(N.is_power_of_two(), "ring capacity must be a power of two");
        N - 1
    };

    #[must_use]
    pub fn new() -> Self {
        let _ = Self::MASK;
        // SAFETY: an array of `MaybeUninit` needs no initialization.
        let buffer = unsafe {
            Box::<[UnsafeCell<MaybeUninit<T>>; N]>::new_uninit().assume_init()
        };
        Self {
            buffer,
            head: Head { value: AtomicUsize::new(0), _pad: [0; 56] },
            tail: Tail { value: AtomicUsize::new(0), _pad: [0; 56] },
        }
    }

    /// Effective capacity: `N - 1`, the reserved slot is never filled.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.value.load(Ordering::Acquire) == self.tail.value.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let tail = self.tail.value.load(Ordering::Acquire);
        let head = self.head.value.load(Ordering::Acquire);
        tail.wrapping_sub(head) & Self::MASK
    }

    /// Single-item producer push. Returns `false` (no state change) if full.
    pub fn try_push(&self, value: T) -> bool {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let next_tail = (tail + 1) & Self::MASK;
        if next_tail == self.head.value.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `tail` is owned exclusively by the single producer and is
        // not the slot the consumer may be reading (checked above).
        unsafe {
            (*self.buffer[tail].get()).write(value);
        }
        self.tail.value.store(next_tail, Ordering::Release);
        true
    }

    /// Single-item consumer pop. Returns `None` if empty.
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.value.load(Ordering::Relaxed);
        if head == self.tail.value.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: `head` is owned exclusively by the single consumer and
        // the producer has published past it (checked above).
        let value = unsafe { (*self.buffer[head].get()).assume_init_read() };
        let next_head = (head + 1) & Self::MASK;
        self.head.value.store(next_head, Ordering::Release);
        Some(value)
    }

    /// Push as many items from `items` as fit. Returns the number pushed;
    /// a single head/tail update is published for the whole batch.
    pub fn try_push_batch(&self, items: &[T]) -> usize
    where
        T: Copy,
    {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let head = self.head.value.load(Ordering::Acquire);
        let used = tail.wrapping_sub(head) & Self::MASK;
        let free = (N - 1) - used;
        let n = items.len().min(free);
        let mut t = tail;
        for item in &items[..n] {
            // SAFETY: each slot written is within the computed free region,
            // none of which the consumer can be reading concurrently.
            unsafe {
                (*self.buffer[t].get()).write(*item);
            }
            t = (t + 1) & Self::MASK;
        }
        if n > 0 {
            self.tail.value.store(t, Ordering::Release);
        }
        n
    }

    /// Pop up to `out.len()` items into `out`. Returns the number popped.
    pub fn try_pop_batch(&self, out: &mut [T]) -> usize
    where
        T: Copy,
    {
        let head = self.head.value.load(Ordering::Relaxed);
        let tail = self.tail.value.load(Ordering::Acquire);
        let available = tail.wrapping_sub(head) & Self::MASK;
        let n = out.len().min(available);
        let mut h = head;
        for slot in out.iter_mut().take(n) {
            // SAFETY: each slot read is within the computed available
            // region, all published by the producer before this load.
            *slot = unsafe { (*self.buffer[h].get()).assume_init_read() };
            h = (h + 1) & Self::MASK;
        }
        if n > 0 {
            self.head.value.store(h, Ordering::Release);
        }
        n
    }
}

impl<T, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
