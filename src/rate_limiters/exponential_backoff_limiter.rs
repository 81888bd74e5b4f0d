use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, trace};

use crate::failures::FailureCounts;
use crate::rate_limiter::RateLimiter;
use crate::ConfigError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Per-item exponential backoff: `base_delay * 2^failures`, capped at `max_delay`.
///
/// Each item keeps its own failure count, so a single item that keeps failing
/// backs off quickly while other items are unaffected. Dealing with a maximum
/// number of attempts is left to the caller via
/// [`num_requeues`](RateLimiter::num_requeues).
///
/// # Algorithm Behavior
///
/// - The first failure of an item in a rate-limiting period waits `base_delay`
/// - Every further failure of the same item doubles the delay
/// - Delays never exceed `max_delay`, including when `2^failures` would overflow
/// - [`forget`](RateLimiter::forget) restarts the item at `base_delay`
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use rate_guard_requeue::RateLimiter;
/// use rate_guard_requeue::rate_limiters::ExponentialBackoffLimiter;
///
/// let limiter: ExponentialBackoffLimiter<&str> =
///     ExponentialBackoffLimiter::new(Duration::from_millis(1), Duration::from_secs(1000));
///
/// assert_eq!(limiter.when(&"pod-a"), Duration::from_millis(1));
/// assert_eq!(limiter.when(&"pod-a"), Duration::from_millis(2));
/// assert_eq!(limiter.when(&"pod-a"), Duration::from_millis(4));
///
/// // Other items start from the base delay
/// assert_eq!(limiter.when(&"pod-b"), Duration::from_millis(1));
///
/// limiter.forget(&"pod-a");
/// assert_eq!(limiter.num_requeues(&"pod-a"), 0);
/// assert_eq!(limiter.when(&"pod-a"), Duration::from_millis(1));
/// ```
pub struct ExponentialBackoffLimiter<K> {
    /// Delay returned for the first failure
    base_delay: Duration,
    /// Upper bound on any returned delay
    max_delay: Duration,
    /// Failure count per item
    failures: FailureCounts<K>,
}

impl<K: Eq + Hash + Clone> ExponentialBackoffLimiter<K> {
    /// Creates a new exponential backoff limiter.
    ///
    /// # Parameters
    ///
    /// * `base_delay` - Delay for the first failure of an item
    /// * `max_delay` - Maximum delay ever returned
    ///
    /// # Panics
    ///
    /// Panics if `base_delay` is greater than `max_delay`.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        match Self::try_new(base_delay, max_delay) {
            Ok(limiter) => limiter,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a new exponential backoff limiter, rejecting an invalid configuration.
    ///
    /// # Returns
    /// * `Ok(limiter)` - If `base_delay <= max_delay`
    /// * `Err(ConfigError::DelayOrder)` - Otherwise
    pub fn try_new(base_delay: Duration, max_delay: Duration) -> Result<Self, ConfigError> {
        if base_delay > max_delay {
            return Err(ConfigError::DelayOrder {
                base: base_delay,
                max: max_delay,
            });
        }

        Ok(ExponentialBackoffLimiter {
            base_delay,
            max_delay,
            failures: FailureCounts::new(),
        })
    }

    /// Delay returned for the first failure of an item.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on every returned delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Number of items currently in a rate-limiting period.
    pub fn tracked_items(&self) -> usize {
        self.failures.len()
    }

    /// Computes `base_delay * 2^exp`, clamped to `max_delay`.
    fn backoff(&self, exp: usize) -> Duration {
        // 0 * 2^n is 0 for any n, however large
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let nanos = u32::try_from(exp)
            .ok()
            .and_then(|exp| 2u128.checked_pow(exp))
            .and_then(|factor| factor.checked_mul(self.base_delay.as_nanos()));

        match nanos {
            Some(nanos) if nanos <= self.max_delay.as_nanos() => {
                // Bounded by max_delay, so the seconds fit in a u64
                Duration::new(
                    (nanos / NANOS_PER_SEC) as u64,
                    (nanos % NANOS_PER_SEC) as u32,
                )
            }
            _ => {
                debug!(
                    failures = exp,
                    max_delay = ?self.max_delay,
                    "exponential backoff clamped to max_delay"
                );
                self.max_delay
            }
        }
    }
}

impl<K> RateLimiter<K> for ExponentialBackoffLimiter<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn when(&self, item: &K) -> Duration {
        let exp = self.failures.record(item);
        let delay = self.backoff(exp);
        trace!(failures = exp + 1, ?delay, "exponential backoff");
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

/// Configuration structure for creating an [`ExponentialBackoffLimiter`].
///
/// The default is a 5ms base delay capped at 1000s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExponentialBackoffLimiterConfig {
    /// Delay for the first failure of an item.
    pub base_delay: Duration,
    /// Maximum delay ever returned.
    pub max_delay: Duration,
}

impl ExponentialBackoffLimiterConfig {
    /// Creates a new configuration instance.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }
}

impl Default for ExponentialBackoffLimiterConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_secs(1000))
    }
}

impl<K: Eq + Hash + Clone> TryFrom<ExponentialBackoffLimiterConfig> for ExponentialBackoffLimiter<K> {
    type Error = ConfigError;

    /// Converts an [`ExponentialBackoffLimiterConfig`] into a limiter.
    ///
    /// # Examples
    ///
    /// ```
    /// use rate_guard_requeue::rate_limiters::{ExponentialBackoffLimiter, ExponentialBackoffLimiterConfig};
    ///
    /// let limiter: ExponentialBackoffLimiter<String> =
    ///     ExponentialBackoffLimiterConfig::default().try_into().unwrap();
    /// ```
    #[inline]
    fn try_from(config: ExponentialBackoffLimiterConfig) -> Result<Self, Self::Error> {
        Self::try_new(config.base_delay, config.max_delay)
    }
}
