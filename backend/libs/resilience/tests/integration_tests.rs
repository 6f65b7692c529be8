/// Integration tests for resilience library
use resilience::{presets, with_retry, Backoff, RetryError, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_fixed_policy_waits_between_attempts() {
    let policy = RetryPolicy::fixed(Duration::from_millis(20)).with_max_attempts(Some(3));

    let start = Instant::now();
    let result = with_retry(&policy, || async { Err::<(), _>("down") }).await;

    assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
    // Two sleeps between three attempts
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_exponential_policy_grows_delay() {
    let policy = RetryPolicy::exponential(Duration::from_millis(10), Duration::from_secs(1))
        .with_max_attempts(Some(4));

    let start = Instant::now();
    let _ = policy.retry(|| async { Err::<(), _>("error") }).await;

    // Expected: 10ms + 20ms + 40ms = 70ms minimum
    assert!(start.elapsed() >= Duration::from_millis(70));
}

#[tokio::test]
async fn test_swapping_backoff_keeps_call_site() {
    async fn connect(policy: &RetryPolicy, fail_times: u32) -> Result<u32, RetryError<String>> {
        let counter = Arc::new(AtomicU32::new(0));
        policy
            .retry(|| {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < fail_times {
                        Err(format!("refused {}", n))
                    } else {
                        Ok(n + 1)
                    }
                }
            })
            .await
    }

    let fixed = RetryPolicy::fixed(Duration::from_millis(1));
    let exponential = RetryPolicy::exponential(Duration::from_millis(1), Duration::from_millis(4));

    assert_eq!(connect(&fixed, 3).await.unwrap(), 4);
    assert_eq!(connect(&exponential, 3).await.unwrap(), 4);
}

#[tokio::test]
async fn test_jitter_stays_within_bounds() {
    let policy = RetryPolicy {
        backoff: Backoff::Fixed(Duration::from_millis(10)),
        max_attempts: Some(2),
        jitter: true,
    };

    let start = Instant::now();
    let _ = policy.retry(|| async { Err::<(), _>("error") }).await;

    // One sleep of 10ms ±30%
    assert!(start.elapsed() >= Duration::from_millis(7));
}

#[test]
fn test_presets() {
    assert!(presets::database_connect().is_unbounded());
}
