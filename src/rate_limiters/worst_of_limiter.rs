use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::rate_limiter::RateLimiter;
use crate::ConfigError;

/// Combines several limiters and always answers with the most conservative one.
///
/// [`when`](RateLimiter::when) is forwarded to every child, so each child records
/// the failure in its own state, and the largest delay wins.
/// [`num_requeues`](RateLimiter::num_requeues) reports the largest count of any
/// child and [`forget`](RateLimiter::forget) clears the item in all children, in
/// the order they were given.
///
/// The usual pairing is a global [`TokenBucketLimiter`](super::TokenBucketLimiter)
/// with a per-item [`ExponentialBackoffLimiter`](super::ExponentialBackoffLimiter),
/// so neither the overall retry rate nor the per-item backoff is ever violated.
/// Because the bucket is charged on every retry, an item delayed for longer by
/// another child can make the bucket's burst appear exceeded once it returns.
///
/// Children are called one after another without a shared lock. A `forget`
/// racing with `when` on the same item may leave the children in different
/// rate-limiting periods for that item.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use rate_guard_requeue::RateLimiter;
/// use rate_guard_requeue::rate_limiters::{ExponentialBackoffLimiter, FastSlowLimiter, WorstOfLimiter};
///
/// let exponential: ExponentialBackoffLimiter<&str> =
///     ExponentialBackoffLimiter::new(Duration::from_millis(1), Duration::from_secs(1));
/// let fast_slow: FastSlowLimiter<&str> =
///     FastSlowLimiter::new(Duration::from_millis(3), Duration::from_secs(1), 1);
///
/// let limiter = WorstOfLimiter::new(vec![
///     Box::new(exponential) as Box<dyn RateLimiter<&str>>,
///     Box::new(fast_slow),
/// ]);
///
/// assert_eq!(limiter.when(&"job"), Duration::from_millis(3)); // max(1ms, 3ms)
/// assert_eq!(limiter.when(&"job"), Duration::from_secs(1));   // max(2ms, 1s)
/// assert_eq!(limiter.num_requeues(&"job"), 2);
///
/// limiter.forget(&"job");
/// assert_eq!(limiter.num_requeues(&"job"), 0);
/// ```
pub struct WorstOfLimiter<K: ?Sized> {
    limiters: Vec<Box<dyn RateLimiter<K>>>,
}

impl<K: ?Sized> WorstOfLimiter<K> {
    /// Creates a limiter combining `limiters`.
    ///
    /// # Panics
    ///
    /// Panics if `limiters` is empty.
    pub fn new(limiters: Vec<Box<dyn RateLimiter<K>>>) -> Self {
        match Self::try_new(limiters) {
            Ok(limiter) => limiter,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a limiter combining `limiters`, returning
    /// [`ConfigError::NoLimiters`] if there are none.
    pub fn try_new(limiters: Vec<Box<dyn RateLimiter<K>>>) -> Result<Self, ConfigError> {
        if limiters.is_empty() {
            return Err(ConfigError::NoLimiters);
        }
        Ok(WorstOfLimiter { limiters })
    }

    /// Number of combined limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Always `false`: construction rejects an empty set.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

impl<K: ?Sized> RateLimiter<K> for WorstOfLimiter<K> {
    fn when(&self, item: &K) -> Duration {
        // Every child must see the failure, so no short-circuiting here
        self.limiters
            .iter()
            .map(|limiter| limiter.when(item))
            .fold(Duration::ZERO, Duration::max)
    }

    fn num_requeues(&self, item: &K) -> usize {
        self.limiters
            .iter()
            .map(|limiter| limiter.num_requeues(item))
            .max()
            .unwrap_or(0)
    }

    fn forget(&self, item: &K) {
        for limiter in &self.limiters {
            limiter.forget(item);
        }
        debug!(limiters = self.limiters.len(), "forgot item in all limiters");
    }
}

impl<K: ?Sized> fmt::Debug for WorstOfLimiter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorstOfLimiter")
            .field("limiters", &self.limiters.len())
            .finish()
    }
}
