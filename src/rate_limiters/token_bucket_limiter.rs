use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::rate_limiter::RateLimiter;
use crate::ConfigError;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Global token bucket shared by every item, adapted to the retry limiter contract.
///
/// The bucket holds up to `burst` tokens and is refilled continuously at `rate`
/// tokens per second. Every [`when`](RateLimiter::when) call reserves one token
/// and returns the time until that token is granted, so the first `burst`
/// retries go through immediately and later ones are spread out at `1 / rate`
/// seconds apart. The limiter does not look at the item: unrelated items share
/// the same budget.
///
/// # Algorithm Behavior
///
/// - The bucket starts full with `burst` tokens
/// - Tokens accrue with elapsed monotonic time, up to `burst`
/// - A reservation always succeeds; when no token is left the balance goes
///   negative and the returned delay covers the deficit
/// - A clock reading older than the last update counts as no elapsed time, so
///   delays are never negative
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use rate_guard_requeue::rate_limiters::TokenBucketLimiter;
///
/// // 10 tokens per second, burst of 2
/// let bucket = TokenBucketLimiter::new(10.0, 2);
/// let now = Instant::now();
///
/// assert_eq!(bucket.reserve_at(now), Duration::ZERO);
/// assert_eq!(bucket.reserve_at(now), Duration::ZERO);
///
/// // Bucket is empty, the next token arrives in 100ms
/// assert_eq!(bucket.reserve_at(now), Duration::from_millis(100));
/// assert_eq!(bucket.reserve_at(now), Duration::from_millis(200));
/// ```
pub struct TokenBucketLimiter {
    /// Tokens added per second
    rate: f64,
    /// Maximum number of tokens the bucket can hold
    burst: u32,
    /// Internal state protected by mutex for thread safety
    state: Mutex<TokenBucketState>,
}

/// Internal state of the token bucket
struct TokenBucketState {
    /// Current token balance, negative while reservations are outstanding
    tokens: f64,
    /// Instant the balance was last brought up to date
    last: Instant,
}

impl TokenBucketLimiter {
    /// Creates a new token bucket limiter.
    ///
    /// # Parameters
    ///
    /// * `rate` - Tokens added per second
    /// * `burst` - Maximum number of tokens the bucket can hold
    ///
    /// # Panics
    ///
    /// Panics if `rate` is not a positive finite number or `burst` is zero.
    pub fn new(rate: f64, burst: u32) -> Self {
        match Self::try_new(rate, burst) {
            Ok(limiter) => limiter,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a new token bucket limiter, rejecting an invalid configuration.
    ///
    /// # Returns
    /// * `Ok(limiter)` - A full bucket
    /// * `Err(ConfigError::InvalidRate)` - If `rate` is zero, negative, NaN or infinite
    /// * `Err(ConfigError::ZeroBurst)` - If `burst` is zero
    pub fn try_new(rate: f64, burst: u32) -> Result<Self, ConfigError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::InvalidRate(rate));
        }
        if burst == 0 {
            return Err(ConfigError::ZeroBurst);
        }

        Ok(TokenBucketLimiter {
            rate,
            burst,
            state: Mutex::new(TokenBucketState {
                tokens: f64::from(burst), // Bucket starts full
                last: Instant::now(),
            }),
        })
    }

    /// Tokens added per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum number of tokens the bucket can hold.
    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Reserves one token at `now` and returns how long to wait until it is granted.
    ///
    /// This is the deterministic form of [`when`](RateLimiter::when), which
    /// calls it with [`Instant::now`].
    pub fn reserve_at(&self, now: Instant) -> Duration {
        let mut state = self.lock();
        self.refill(&mut state, now);

        state.tokens -= 1.0;
        if state.tokens >= 0.0 {
            return Duration::ZERO;
        }

        let delay = self.duration_from_tokens(-state.tokens);
        trace!(tokens = state.tokens, ?delay, "token bucket exhausted");
        delay
    }

    /// Returns the token balance at `now` after refilling.
    ///
    /// The balance is negative while granted reservations are still waiting
    /// for their tokens.
    pub fn tokens_at(&self, now: Instant) -> f64 {
        let mut state = self.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    /// Adds the tokens accrued since the last update, capped at `burst`.
    #[inline(always)]
    fn refill(&self, state: &mut TokenBucketState, now: Instant) {
        // Time going backwards counts as no elapsed time
        let elapsed = now.saturating_duration_since(state.last);
        let refilled = elapsed.as_secs_f64() * self.rate;
        state.tokens = (state.tokens + refilled).min(f64::from(self.burst));
        if now > state.last {
            state.last = now;
        }
    }

    /// Time needed to accumulate `tokens` tokens, rounded up to the nanosecond.
    fn duration_from_tokens(&self, tokens: f64) -> Duration {
        let nanos = (tokens * NANOS_PER_SEC / self.rate).ceil();
        if nanos >= u64::MAX as f64 {
            return Duration::from_nanos(u64::MAX);
        }
        Duration::from_nanos(nanos as u64)
    }

    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, TokenBucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: ?Sized> RateLimiter<K> for TokenBucketLimiter {
    #[inline]
    fn when(&self, _item: &K) -> Duration {
        self.reserve_at(Instant::now())
    }

    /// Always 0: the bucket does not track items.
    #[inline]
    fn num_requeues(&self, _item: &K) -> usize {
        0
    }

    #[inline]
    fn forget(&self, _item: &K) {}
}

/// Configuration structure for creating a [`TokenBucketLimiter`].
///
/// The default is 10 tokens per second with a burst of 100.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenBucketLimiterConfig {
    /// Tokens added per second.
    pub rate: f64,
    /// Maximum number of tokens the bucket can hold.
    pub burst: u32,
}

impl TokenBucketLimiterConfig {
    /// Creates a new configuration instance.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self { rate, burst }
    }
}

impl Default for TokenBucketLimiterConfig {
    fn default() -> Self {
        Self::new(10.0, 100)
    }
}

impl TryFrom<TokenBucketLimiterConfig> for TokenBucketLimiter {
    type Error = ConfigError;

    /// Converts a [`TokenBucketLimiterConfig`] into a [`TokenBucketLimiter`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rate_guard_requeue::rate_limiters::{TokenBucketLimiter, TokenBucketLimiterConfig};
    /// use rate_guard_requeue::ConfigError;
    ///
    /// let limiter = TokenBucketLimiter::try_from(TokenBucketLimiterConfig::default()).unwrap();
    /// assert_eq!(limiter.burst(), 100);
    ///
    /// let err = TokenBucketLimiter::try_from(TokenBucketLimiterConfig::new(10.0, 0));
    /// assert_eq!(err.err(), Some(ConfigError::ZeroBurst));
    /// ```
    #[inline]
    fn try_from(config: TokenBucketLimiterConfig) -> Result<Self, Self::Error> {
        Self::try_new(config.rate, config.burst)
    }
}
