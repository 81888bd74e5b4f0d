use std::time::{Duration, Instant};

use rate_guard_requeue::rate_limiters::{TokenBucketLimiter, TokenBucketLimiterConfig};
use rate_guard_requeue::{ConfigError, RateLimiter};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_new_token_bucket() {
    let bucket = TokenBucketLimiter::new(10.0, 100);
    assert_eq!(bucket.rate(), 10.0);
    assert_eq!(bucket.burst(), 100);
}

#[test]
#[should_panic(expected = "burst must be greater than 0")]
fn test_new_with_zero_burst() {
    TokenBucketLimiter::new(10.0, 0);
}

#[test]
#[should_panic(expected = "rate must be a positive finite number")]
fn test_new_with_zero_rate() {
    TokenBucketLimiter::new(0.0, 100);
}

#[test]
fn test_try_new_rejects_invalid_rates() {
    assert_eq!(
        TokenBucketLimiter::try_new(-1.0, 10).err(),
        Some(ConfigError::InvalidRate(-1.0))
    );
    assert!(TokenBucketLimiter::try_new(f64::NAN, 10).is_err());
    assert!(TokenBucketLimiter::try_new(f64::INFINITY, 10).is_err());
    assert_eq!(TokenBucketLimiter::try_new(10.0, 0).err(), Some(ConfigError::ZeroBurst));
}

#[test]
fn test_initial_burst_is_immediate() {
    let bucket = TokenBucketLimiter::new(10.0, 100);
    let now = Instant::now();

    // Bucket starts full, the whole burst goes through without delay
    for _ in 0..100 {
        assert_eq!(bucket.reserve_at(now), Duration::ZERO);
    }
}

#[test]
fn test_delay_grows_by_refill_interval_after_burst() {
    let bucket = TokenBucketLimiter::new(10.0, 100);
    let now = Instant::now();

    for _ in 0..100 {
        bucket.reserve_at(now);
    }

    // One token every 100ms: item 101 waits 100ms, item 102 200ms, ...
    assert_eq!(bucket.reserve_at(now), ms(100));
    assert_eq!(bucket.reserve_at(now), ms(200));
    assert_eq!(bucket.reserve_at(now), ms(300));
    assert_eq!(bucket.reserve_at(now), ms(400));
}

#[test]
fn test_refill_over_time() {
    let bucket = TokenBucketLimiter::new(10.0, 5);
    let start = Instant::now();

    for _ in 0..5 {
        assert_eq!(bucket.reserve_at(start), Duration::ZERO);
    }
    assert_eq!(bucket.reserve_at(start), ms(100)); // balance -1

    // 300ms later three tokens have arrived: balance 2
    let later = start + ms(300);
    let tokens = bucket.tokens_at(later);
    assert!((tokens - 2.0).abs() < 1e-9, "tokens = {}", tokens);

    assert_eq!(bucket.reserve_at(later), Duration::ZERO);
    assert_eq!(bucket.reserve_at(later), Duration::ZERO);
    let delay = bucket.reserve_at(later);
    assert!(delay > ms(99) && delay <= ms(100), "delay = {:?}", delay);
}

#[test]
fn test_refill_is_capped_at_burst() {
    let bucket = TokenBucketLimiter::new(10.0, 5);
    let start = Instant::now();

    for _ in 0..3 {
        bucket.reserve_at(start);
    }

    // A long idle period refills only up to the burst size
    let later = start + Duration::from_secs(3600);
    assert_eq!(bucket.tokens_at(later), 5.0);
    for _ in 0..5 {
        assert_eq!(bucket.reserve_at(later), Duration::ZERO);
    }
    assert_eq!(bucket.reserve_at(later), ms(100));
}

#[test]
fn test_outstanding_reservations_delay_later_callers() {
    let bucket = TokenBucketLimiter::new(10.0, 1);
    let start = Instant::now();

    assert_eq!(bucket.reserve_at(start), Duration::ZERO);
    assert_eq!(bucket.reserve_at(start), ms(100));
    assert_eq!(bucket.reserve_at(start), ms(200));

    // 100ms later the first waiter's token has arrived; one is still owed
    let later = start + ms(100);
    let delay = bucket.reserve_at(later);
    assert!(delay > ms(199) && delay <= ms(200), "delay = {:?}", delay);
}

#[test]
fn test_time_going_backwards_never_yields_negative_delay() {
    let bucket = TokenBucketLimiter::new(10.0, 1);
    let start = Instant::now();
    let later = start + Duration::from_secs(1);

    assert_eq!(bucket.reserve_at(later), Duration::ZERO);

    // An earlier reading counts as no elapsed time
    assert_eq!(bucket.reserve_at(start), ms(100));
    assert_eq!(bucket.reserve_at(start), ms(200));
}

#[test]
fn test_fractional_rate() {
    // One token every two seconds
    let bucket = TokenBucketLimiter::new(0.5, 1);
    let now = Instant::now();

    assert_eq!(bucket.reserve_at(now), Duration::ZERO);
    assert_eq!(bucket.reserve_at(now), Duration::from_secs(2));
    assert_eq!(bucket.reserve_at(now), Duration::from_secs(4));
}

#[test]
fn test_item_identity_is_ignored() {
    let bucket = TokenBucketLimiter::new(1.0, 2);

    assert!(bucket.when(&"one") <= Duration::from_millis(1));
    assert!(bucket.when(&"two") <= Duration::from_millis(1));

    // Unrelated items compete for the same tokens
    let delay = RateLimiter::<&str>::when(&bucket, &"three");
    assert!(delay > ms(900) && delay <= Duration::from_secs(1), "delay = {:?}", delay);
}

#[test]
fn test_num_requeues_and_forget() {
    let bucket = TokenBucketLimiter::new(10.0, 1);

    bucket.when(&"one");
    bucket.when(&"one");
    assert_eq!(bucket.num_requeues(&"one"), 0);

    // No-op, does not give tokens back
    bucket.forget(&"one");
    bucket.forget(&"never-seen");
    assert_eq!(bucket.num_requeues(&"one"), 0);
    assert!(bucket.when(&"one") > ms(100));
}

#[test]
fn test_from_config() {
    let config = TokenBucketLimiterConfig::default();
    assert_eq!(config.rate, 10.0);
    assert_eq!(config.burst, 100);

    let bucket: TokenBucketLimiter = config.try_into().unwrap();
    assert_eq!(bucket.burst(), 100);

    assert!(TokenBucketLimiter::try_from(TokenBucketLimiterConfig::new(0.0, 1)).is_err());
}
