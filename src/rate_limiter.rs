//! Core trait for retry rate limiters.
//!
//! This module defines the contract shared by every limiter in the crate, so a
//! work queue can hold any of them (or a composition of them) behind one type.

use std::sync::Arc;
use std::time::Duration;

/// The contract implemented by all retry rate limiters.
///
/// A work queue calls [`when`](RateLimiter::when) each time an item fails and
/// must be retried, waits (or schedules re-insertion) for the returned delay,
/// and calls [`forget`](RateLimiter::forget) once the item succeeds or is
/// abandoned. [`num_requeues`](RateLimiter::num_requeues) lets the queue cap
/// the total number of attempts.
///
/// The item type `K` is opaque to the limiter; it is only used as a key.
/// All methods take `&self` and may be called from many threads at once.
pub trait RateLimiter<K: ?Sized>: Send + Sync {
    /// Returns how long the caller should wait before `item` is eligible again.
    ///
    /// Records one more failure for `item` in limiters that track items.
    /// The delay is a value to wait for, never a sleep performed here.
    fn when(&self, item: &K) -> Duration;

    /// Returns how many failures have been recorded for `item` since it was
    /// last forgotten. Unknown items report 0. Never mutates state.
    fn num_requeues(&self, item: &K) -> usize;

    /// Stops tracking `item`. Forgetting an unknown item is a no-op.
    fn forget(&self, item: &K);
}

impl<K: ?Sized, L: RateLimiter<K> + ?Sized> RateLimiter<K> for Box<L> {
    #[inline]
    fn when(&self, item: &K) -> Duration {
        (**self).when(item)
    }

    #[inline]
    fn num_requeues(&self, item: &K) -> usize {
        (**self).num_requeues(item)
    }

    #[inline]
    fn forget(&self, item: &K) {
        (**self).forget(item)
    }
}

/// Lets a caller keep a handle on a limiter that a
/// [`WorstOfLimiter`](crate::rate_limiters::WorstOfLimiter) also owns.
impl<K: ?Sized, L: RateLimiter<K> + ?Sized> RateLimiter<K> for Arc<L> {
    #[inline]
    fn when(&self, item: &K) -> Duration {
        (**self).when(item)
    }

    #[inline]
    fn num_requeues(&self, item: &K) -> usize {
        (**self).num_requeues(item)
    }

    #[inline]
    fn forget(&self, item: &K) {
        (**self).forget(item)
    }
}

impl<K: ?Sized, L: RateLimiter<K> + ?Sized> RateLimiter<K> for &L {
    #[inline]
    fn when(&self, item: &K) -> Duration {
        (**self).when(item)
    }

    #[inline]
    fn num_requeues(&self, item: &K) -> usize {
        (**self).num_requeues(item)
    }

    #[inline]
    fn forget(&self, item: &K) {
        (**self).forget(item)
    }
}
