/// Retry policy with pluggable backoff
///
/// Call sites hold a `RetryPolicy` and call `retry()`; switching a caller from a
/// fixed delay to exponential backoff only changes how the policy is built.
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay after every failed attempt
    Fixed(Duration),
    /// Delay grows by `multiplier` per failed attempt, capped at `max`
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// Total attempts allowed (first try included). `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Add random jitter to each delay (±30%)
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(10),
            },
            max_attempts: Some(4),
            jitter: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

impl RetryPolicy {
    /// Fixed delay, unbounded attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(delay),
            max_attempts: None,
            jitter: false,
        }
    }

    /// Exponential backoff (x2), unbounded attempts.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            backoff: Backoff::Exponential {
                initial,
                multiplier: 2.0,
                max,
            },
            max_attempts: None,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.map(|n| n.max(1));
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }

    /// Whether another attempt may run after `attempts` failures.
    pub fn allows_another(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Base delay (without jitter) after the `failed_attempts`-th failure (1-based).
    pub fn base_delay(&self, failed_attempts: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exp = failed_attempts.saturating_sub(1).min(63) as i32;
                let millis = initial.as_millis() as f64 * multiplier.powi(exp);
                Duration::from_millis(millis.min(max.as_millis() as f64) as u64)
            }
        }
    }

    fn delay_for(&self, failed_attempts: u32) -> Duration {
        apply_jitter(self.base_delay(failed_attempts), self.jitter)
    }

    /// Run `f` until it succeeds or the policy runs out of attempts.
    pub async fn retry<F, Fut, T, E>(&self, mut f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempts = 0u32;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts = attempts.saturating_add(1);

                    if !self.allows_another(attempts) {
                        warn!(attempts, error = %e, "Retry attempts exhausted");
                        return Err(RetryError::Exhausted {
                            attempts,
                            last_error: e,
                        });
                    }

                    let delay = self.delay_for(attempts);
                    match self.max_attempts {
                        Some(max) => warn!(
                            "Attempt {}/{} failed: {}; retrying in {:?}",
                            attempts, max, e, delay
                        ),
                        None => warn!(
                            "Attempt {} failed: {}; retrying in {:?}",
                            attempts, e, delay
                        ),
                    }

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Execute a future with retry logic
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, f: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    policy.retry(f).await
}

fn apply_jitter(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let jitter_factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}
