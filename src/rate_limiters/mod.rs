//! Retry rate limiter implementations.
//!
//! Each limiter implements [`RateLimiter`](crate::RateLimiter) and can be used
//! on its own or combined with others through [`WorstOfLimiter`].
//!
//! # Available Limiters
//!
//! - **[`TokenBucketLimiter`]** - Global retry throughput cap shared by all items
//! - **[`ExponentialBackoffLimiter`]** - Per-item delay doubling on every failure
//! - **[`FastSlowLimiter`]** - Per-item quick retries, then a fixed slow delay
//! - **[`WorstOfLimiter`]** - Largest delay of a set of limiters
//!
//! # Limiter Comparison
//!
//! | Limiter | Per-item state | Delay growth | Use Case |
//! |---------|----------------|--------------|----------|
//! | Token Bucket | No | Linear once burst is spent | Protect a shared backend |
//! | Exponential | Yes | Doubling, capped | Persistently failing items |
//! | Fast/Slow | Yes | One step | Transient then persistent failures |
//! | Worst-Of | Children's | Maximum of children | Combining global and per-item limits |
//!
//! # Thread Safety
//!
//! Per-item limiters guard their failure counts with a mutex held only for the
//! map access. The token bucket serialises reservations behind its own mutex.

pub mod token_bucket_limiter;
pub use token_bucket_limiter::TokenBucketLimiter;
pub use token_bucket_limiter::TokenBucketLimiterConfig;

pub mod exponential_backoff_limiter;
pub use exponential_backoff_limiter::ExponentialBackoffLimiter;
pub use exponential_backoff_limiter::ExponentialBackoffLimiterConfig;

pub mod fast_slow_limiter;
pub use fast_slow_limiter::FastSlowLimiter;
pub use fast_slow_limiter::FastSlowLimiterConfig;

pub mod worst_of_limiter;
pub use worst_of_limiter::WorstOfLimiter;
