//! error.rs
//! Construction-time configuration errors.
//!
//! Once built, every limiter operation is total; the only failure mode is a
//! configuration that would yield meaningless delays.

use std::time::Duration;

/// Rejected limiter configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Exponential backoff would start above its own ceiling.
    #[error("base_delay ({base:?}) must not exceed max_delay ({max:?})")]
    DelayOrder { base: Duration, max: Duration },

    /// Fast retries would be slower than slow retries.
    #[error("fast_delay ({fast:?}) must not exceed slow_delay ({slow:?})")]
    FastSlowOrder { fast: Duration, slow: Duration },

    /// Token refill rate is zero, negative, NaN or infinite.
    #[error("rate must be a positive finite number of tokens per second, got {0}")]
    InvalidRate(f64),

    /// A bucket that can hold no tokens never grants a reservation.
    #[error("burst must be greater than 0")]
    ZeroBurst,

    /// A worst-of limiter was built with nothing to combine.
    #[error("at least one limiter is required")]
    NoLimiters,
}
