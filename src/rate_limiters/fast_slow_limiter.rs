use std::hash::Hash;
use std::time::Duration;

use tracing::trace;

use crate::failures::FailureCounts;
use crate::rate_limiter::RateLimiter;
use crate::ConfigError;

/// Per-item limiter that retries quickly a fixed number of times, then slowly.
///
/// The first `max_fast_attempts` failures of an item in a rate-limiting period
/// wait `fast_delay`; every later failure waits `slow_delay`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use rate_guard_requeue::RateLimiter;
/// use rate_guard_requeue::rate_limiters::FastSlowLimiter;
///
/// let limiter: FastSlowLimiter<u32> = FastSlowLimiter::new(Duration::from_millis(5), Duration::from_secs(10), 3);
///
/// for _ in 0..3 {
///     assert_eq!(limiter.when(&42u32), Duration::from_millis(5));
/// }
/// assert_eq!(limiter.when(&42u32), Duration::from_secs(10));
/// assert_eq!(limiter.num_requeues(&42u32), 4);
/// ```
pub struct FastSlowLimiter<K> {
    fast_delay: Duration,
    slow_delay: Duration,
    /// Failures answered with `fast_delay` before switching to `slow_delay`
    max_fast_attempts: usize,
    failures: FailureCounts<K>,
}

impl<K: Eq + Hash + Clone> FastSlowLimiter<K> {
    /// Creates a new fast/slow limiter.
    ///
    /// A `max_fast_attempts` of 0 makes every retry slow.
    ///
    /// # Panics
    ///
    /// Panics if `fast_delay` is greater than `slow_delay`.
    pub fn new(fast_delay: Duration, slow_delay: Duration, max_fast_attempts: usize) -> Self {
        match Self::try_new(fast_delay, slow_delay, max_fast_attempts) {
            Ok(limiter) => limiter,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a new fast/slow limiter, returning
    /// [`ConfigError::FastSlowOrder`] if `fast_delay > slow_delay`.
    pub fn try_new(
        fast_delay: Duration,
        slow_delay: Duration,
        max_fast_attempts: usize,
    ) -> Result<Self, ConfigError> {
        if fast_delay > slow_delay {
            return Err(ConfigError::FastSlowOrder {
                fast: fast_delay,
                slow: slow_delay,
            });
        }

        Ok(FastSlowLimiter {
            fast_delay,
            slow_delay,
            max_fast_attempts,
            failures: FailureCounts::new(),
        })
    }

    /// Delay returned for the first `max_fast_attempts` failures of an item.
    pub fn fast_delay(&self) -> Duration {
        self.fast_delay
    }

    /// Delay returned once an item has used up its fast attempts.
    pub fn slow_delay(&self) -> Duration {
        self.slow_delay
    }

    /// Number of failures answered with `fast_delay`.
    pub fn max_fast_attempts(&self) -> usize {
        self.max_fast_attempts
    }

    /// Number of items currently in a rate-limiting period.
    pub fn tracked_items(&self) -> usize {
        self.failures.len()
    }
}

impl<K> RateLimiter<K> for FastSlowLimiter<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn when(&self, item: &K) -> Duration {
        let failures = self.failures.record(item).saturating_add(1);
        let delay = if failures <= self.max_fast_attempts {
            self.fast_delay
        } else {
            self.slow_delay
        };
        trace!(failures, ?delay, "fast/slow backoff");
        delay
    }

    #[inline]
    fn num_requeues(&self, item: &K) -> usize {
        self.failures.get(item)
    }

    #[inline]
    fn forget(&self, item: &K) {
        self.failures.forget(item)
    }
}

/// Configuration structure for creating a [`FastSlowLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastSlowLimiterConfig {
    /// Delay for the first `max_fast_attempts` failures.
    pub fast_delay: Duration,
    /// Delay for every later failure.
    pub slow_delay: Duration,
    /// Number of fast retries.
    pub max_fast_attempts: usize,
}

impl FastSlowLimiterConfig {
    /// Creates a new configuration instance.
    pub fn new(fast_delay: Duration, slow_delay: Duration, max_fast_attempts: usize) -> Self {
        Self {
            fast_delay,
            slow_delay,
            max_fast_attempts,
        }
    }
}

impl<K: Eq + Hash + Clone> TryFrom<FastSlowLimiterConfig> for FastSlowLimiter<K> {
    type Error = ConfigError;

    #[inline]
    fn try_from(config: FastSlowLimiterConfig) -> Result<Self, Self::Error> {
        Self::try_new(config.fast_delay, config.slow_delay, config.max_fast_attempts)
    }
}
