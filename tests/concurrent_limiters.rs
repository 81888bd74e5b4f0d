use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rate_guard_requeue::rate_limiters::{
    ExponentialBackoffLimiter, FastSlowLimiter, TokenBucketLimiter, WorstOfLimiter,
};
use rate_guard_requeue::RateLimiter;

const THREADS: usize = 8;
const CALLS_PER_THREAD: usize = 250;

#[test]
fn test_exponential_counts_every_concurrent_failure() {
    let limiter: ExponentialBackoffLimiter<u32> =
        ExponentialBackoffLimiter::new(Duration::from_millis(1), Duration::from_secs(1));

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..CALLS_PER_THREAD {
                    let delay = limiter.when(&7);
                    assert!(delay >= Duration::from_millis(1));
                    assert!(delay <= Duration::from_secs(1));
                }
            });
        }
    });

    assert_eq!(limiter.num_requeues(&7), THREADS * CALLS_PER_THREAD);
}

#[test]
fn test_fast_slow_hands_out_exactly_max_fast_attempts() {
    let fast = Duration::from_millis(5);
    let limiter: FastSlowLimiter<&str> = FastSlowLimiter::new(fast, Duration::from_secs(10), 100);

    let fast_count: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..CALLS_PER_THREAD)
                        .filter(|_| limiter.when(&"shared") == fast)
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(fast_count, 100);
    assert_eq!(limiter.num_requeues(&"shared"), THREADS * CALLS_PER_THREAD);
}

#[test]
fn test_token_bucket_grants_burst_once_under_contention() {
    let bucket = TokenBucketLimiter::new(10.0, 100);
    let now = Instant::now();

    let immediate: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..CALLS_PER_THREAD)
                        .filter(|_| bucket.reserve_at(now) == Duration::ZERO)
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(immediate, 100);

    // Every reservation was charged: 2000 granted, 100 from the burst
    let owed = THREADS * CALLS_PER_THREAD - 100;
    assert_eq!(bucket.tokens_at(now), -(owed as f64));
}

#[test]
fn test_worst_of_shared_across_threads() {
    let per_item = Arc::new(ExponentialBackoffLimiter::<usize>::new(
        Duration::from_millis(1),
        Duration::from_secs(1),
    ));
    let limiter = Arc::new(WorstOfLimiter::new(vec![
        Box::new(per_item.clone()) as Box<dyn RateLimiter<usize>>,
        Box::new(TokenBucketLimiter::new(1000.0, 1000)),
    ]));

    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                for _ in 0..10 {
                    limiter.when(&worker);
                }
                // Succeeded: stop tracking
                limiter.forget(&worker);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for worker in 0..THREADS {
        assert_eq!(limiter.num_requeues(&worker), 0);
        assert_eq!(per_item.num_requeues(&worker), 0);
    }
    assert_eq!(per_item.tracked_items(), 0);
}
