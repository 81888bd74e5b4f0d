//! Retry rate limiters for work queues.
//!
//! When a work item fails and must be retried, a work queue asks a
//! [`RateLimiter`] how long to wait before re-adding it, checks how many times
//! it has been requeued, and tells the limiter to forget the item once it
//! succeeds or is given up on. All limiters are thread-safe and never sleep:
//! they compute a delay and leave the waiting to the caller.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use rate_guard_requeue::{default_controller_rate_limiter, RateLimiter};
//!
//! let limiter = default_controller_rate_limiter::<String>();
//! let item = "namespace/pod".to_string();
//!
//! // First failure: the per-item backoff starts at 5ms
//! assert_eq!(limiter.when(&item), Duration::from_millis(5));
//! assert_eq!(limiter.when(&item), Duration::from_millis(10));
//! assert_eq!(limiter.num_requeues(&item), 2);
//!
//! // Processed successfully
//! limiter.forget(&item);
//! assert_eq!(limiter.num_requeues(&item), 0);
//! ```
//!
//! # Available Limiters
//!
//! ## [Token Bucket](rate_limiters::TokenBucketLimiter)
//! Caps the overall retry rate, regardless of which item is retried:
//! ```rust
//! # use rate_guard_requeue::rate_limiters::TokenBucketLimiter;
//! let limiter = TokenBucketLimiter::new(10.0, 100); // 10 retries/s, bursts of 100
//! ```
//!
//! ## [Exponential Backoff](rate_limiters::ExponentialBackoffLimiter)
//! Doubles the delay on every failure of the same item:
//! ```rust
//! # use std::time::Duration;
//! # use rate_guard_requeue::rate_limiters::ExponentialBackoffLimiter;
//! let limiter: ExponentialBackoffLimiter<u64> =
//!     ExponentialBackoffLimiter::new(Duration::from_millis(5), Duration::from_secs(1000));
//! ```
//!
//! ## [Fast/Slow](rate_limiters::FastSlowLimiter)
//! A few quick retries, then a long fixed delay:
//! ```rust
//! # use std::time::Duration;
//! # use rate_guard_requeue::rate_limiters::FastSlowLimiter;
//! let limiter: FastSlowLimiter<u64> =
//!     FastSlowLimiter::new(Duration::from_millis(5), Duration::from_secs(10), 3);
//! ```
//!
//! ## [Worst-Of](rate_limiters::WorstOfLimiter)
//! Asks every child and returns the largest delay. See
//! [`default_controller_rate_limiter`] for the usual composition.
//!
//! # Core Concepts
//!
//! ## Rate-limiting period
//! Per-item limiters count failures from an item's first
//! [`when`](RateLimiter::when) until its next [`forget`](RateLimiter::forget).
//! Backoff grows only within one period; forgetting starts a new one.
//!
//! ## Error Handling
//! Limiter operations cannot fail. Invalid parameters are rejected when a
//! limiter is built: `new` panics, while `try_new` and the `TryFrom<Config>`
//! conversions return a [`ConfigError`].
//!
//! ## Logging
//! Delay decisions are emitted as [`tracing`] events at `trace` level;
//! backoff clamping and composite forgets at `debug` level.

use std::hash::Hash;
use std::time::Duration;

pub mod error;
pub mod rate_limiter;
pub mod rate_limiters;

mod failures;

pub use error::ConfigError;
pub use rate_limiter::RateLimiter;

use rate_limiters::{
    ExponentialBackoffLimiter, ExponentialBackoffLimiterConfig, TokenBucketLimiter,
    TokenBucketLimiterConfig, WorstOfLimiter,
};

/// Default limiter for a controller work queue.
///
/// Combines per-item exponential backoff (5ms doubling up to 1000s) with an
/// overall token bucket (10 retries per second, burst of 100). The bucket only
/// shapes retry speed across all items; the backoff is per item.
pub fn default_controller_rate_limiter<K>() -> WorstOfLimiter<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    let ExponentialBackoffLimiterConfig {
        base_delay,
        max_delay,
    } = ExponentialBackoffLimiterConfig::default();
    let TokenBucketLimiterConfig { rate, burst } = TokenBucketLimiterConfig::default();

    let per_item: ExponentialBackoffLimiter<K> = ExponentialBackoffLimiter::new(base_delay, max_delay);
    let overall = TokenBucketLimiter::new(rate, burst);

    WorstOfLimiter::new(vec![
        Box::new(per_item) as Box<dyn RateLimiter<K>>,
        Box::new(overall),
    ])
}

/// Per-item exponential backoff starting at 1ms and capped at 1000s, with no
/// overall rate limit.
pub fn default_item_based_rate_limiter<K>() -> ExponentialBackoffLimiter<K>
where
    K: Eq + Hash + Clone,
{
    ExponentialBackoffLimiter::new(Duration::from_millis(1), Duration::from_secs(1000))
}
