//! Retry with exponential backoff and a circuit breaker.
//!
//! Both primitives are generic over the wrapped operation and its error
//! type; they hold no references to the rest of the system and can wrap any
//! fallible asynchronous call. Delays are realized with [`tokio::time::sleep`]
//! so they never block other tasks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Backoff configuration for [`with_retry`] and [`with_smart_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
        }
    }
}

/// Outcome of a retried operation.
///
/// `success` is true iff some attempt returned `Ok`; on exhaustion the last
/// observed error is carried in `error`.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<E>,
    pub attempts: u32,
    pub total_delay: Duration,
}

impl<T, E> RetryResult<T, E> {
    fn succeeded(value: T, attempts: u32, total_delay: Duration) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            attempts,
            total_delay,
        }
    }

    fn failed(error: E, attempts: u32, total_delay: Duration) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error),
            attempts,
            total_delay,
        }
    }
}

/// Delay before the next attempt: `base * multiplier^(attempt-1)`, capped.
fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = config
        .backoff_multiplier
        .powi(attempt.saturating_sub(1) as i32);
    let millis = config.base_delay.as_millis() as f64 * factor;
    let capped = millis.min(config.max_delay.as_millis() as f64);
    Duration::from_millis(capped as u64)
}

/// Invokes `op` up to `config.max_retries` times with exponential backoff.
///
/// The final attempt's failure is surfaced as `success = false`; no attempt
/// is ever made beyond `max_retries`.
pub async fn with_retry<T, E, F, Fut>(mut op: F, config: &RetryConfig) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_retries.max(1);
    let mut total_delay = Duration::ZERO;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return RetryResult::succeeded(value, attempt, total_delay),
            Err(error) => {
                if attempt == max_attempts {
                    return RetryResult::failed(error, attempt, total_delay);
                }
                let delay = backoff_delay(config, attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "attempt failed, backing off");
                total_delay += delay;
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("retry loop returns on the last attempt")
}

/// Error-message phrases that indicate a transient, retryable failure.
static RETRYABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate limit|timeout|network|temporary|unavailable|too many requests|quota exceeded").expect("retryable pattern is valid")
});

/// Returns true when the error message matches a known transient pattern.
pub fn is_retryable_error<E: Display>(error: &E) -> bool {
    RETRYABLE_PATTERN.is_match(&error.to_string())
}

/// Like [`with_retry`], but a non-retryable error ends the loop immediately.
///
/// Retryability is classified by [`is_retryable_error`]. Errors that do not
/// match any transient pattern are surfaced at once with the attempts made
/// so far, without further backoff sleeps.
pub async fn with_smart_retry<T, E, F, Fut>(mut op: F, config: &RetryConfig) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_retries.max(1);
    let mut total_delay = Duration::ZERO;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return RetryResult::succeeded(value, attempt, total_delay),
            Err(error) => {
                if attempt == max_attempts || !is_retryable_error(&error) {
                    return RetryResult::failed(error, attempt, total_delay);
                }
                let delay = backoff_delay(config, attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "transient failure, backing off");
                total_delay += delay;
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("retry loop returns on the last attempt")
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through; failures increment the counter.
    Closed,
    /// Calls fail fast until the reset timeout elapses.
    Open,
    /// One trial call is allowed through.
    HalfOpen,
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    #[error("circuit breaker is open")]
    Open,
    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    probing: bool,
}

/// Three-state circuit breaker around a fallible asynchronous operation.
///
/// Reaching `failure_threshold` consecutive failures opens the breaker;
/// after `reset_timeout` a single trial call is let through. Success closes
/// the breaker and zeroes the counter, failure re-opens it. State is local
/// to one breaker instance.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
                probing: false,
            }),
        }
    }

    /// Runs `op` through the breaker.
    ///
    /// When open, fails fast with [`BreakerError::Open`] without invoking
    /// `op`. While a half-open trial is in flight, concurrent calls also
    /// fail fast.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                BreakerState::Open => {
                    let elapsed = inner
                        .last_failure
                        .map(|at| at.elapsed() >= self.reset_timeout)
                        .unwrap_or(true);
                    if elapsed {
                        tracing::debug!("breaker reset timeout elapsed, allowing trial call");
                        inner.state = BreakerState::HalfOpen;
                        inner.probing = true;
                    } else {
                        return Err(BreakerError::Open);
                    }
                }
                BreakerState::HalfOpen => {
                    if inner.probing {
                        return Err(BreakerError::Open);
                    }
                    inner.probing = true;
                }
                BreakerState::Closed => {}
            }
        }

        let result = op().await;

        let mut inner = self.inner.lock().await;
        inner.probing = false;
        match result {
            Ok(value) => {
                if inner.state == BreakerState::HalfOpen {
                    tracing::debug!("trial call succeeded, closing breaker");
                    inner.state = BreakerState::Closed;
                    inner.failure_count = 0;
                }
                Ok(value)
            }
            Err(error) => {
                inner.failure_count += 1;
                inner.last_failure = Some(Instant::now());
                if inner.state == BreakerState::HalfOpen
                    || inner.failure_count >= self.failure_threshold
                {
                    if inner.state != BreakerState::Open {
                        tracing::warn!(failures = inner.failure_count, "opening circuit breaker");
                    }
                    inner.state = BreakerState::Open;
                }
                Err(BreakerError::Inner(error))
            }
        }
    }

    /// Current breaker state.
    pub async fn state(&self) -> BreakerState {
        self.inner.lock().await.state
    }

    /// Consecutive failure count since the last successful trial.
    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let result = with_retry(
            move || {
                let calls = calls_in_op.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(format!("temporary failure (attempt {n})"))
                    } else {
                        Ok("done")
                    }
                }
            },
            &quick_config(3),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.value, Some("done"));
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_surfaces_last_error() {
        let result: RetryResult<(), String> = with_retry(
            || async { Err("network glitch".to_string()) },
            &quick_config(3),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.error.as_deref(), Some("network glitch"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_is_capped_and_accumulated() {
        let config = RetryConfig {
            max_retries: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(150),
            backoff_multiplier: 2.0,
        };
        let result: RetryResult<(), String> =
            with_retry(|| async { Err("timeout".to_string()) }, &config).await;

        // 100 + 150 (capped from 200) + 150 (capped from 400)
        assert_eq!(result.total_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable_error(&"Rate limit hit, slow down"));
        assert!(is_retryable_error(&"connection timeout"));
        assert!(is_retryable_error(&"service temporarily Unavailable"));
        assert!(is_retryable_error(&"quota exceeded for project"));
        assert!(!is_retryable_error(&"invalid credentials"));
        assert!(!is_retryable_error(&"parse error at line 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_smart_retry_short_circuits_non_retryable() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let result: RetryResult<(), String> = with_smart_retry(
            move || {
                let calls = calls_in_op.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("invalid credentials".to_string())
                }
            },
            &quick_config(3),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.total_delay, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_smart_retry_still_retries_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let result = with_smart_retry(
            move || {
                let calls = calls_in_op.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 2 {
                        Err("temporary failure".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            &quick_config(3),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opens_after_threshold_and_fails_fast() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result: Result<(), _> = breaker
                .execute(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("boom".to_string())
                })
                .await;
            assert!(matches!(result, Err(BreakerError::Inner(_))));
        }
        assert_eq!(breaker.state().await, BreakerState::Open);

        // Open state fails fast without invoking the operation.
        let calls_probe = calls.clone();
        let result: Result<(), _> = breaker
            .execute(move || async move {
                calls_probe.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_half_open_trial_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(100));

        let _ = breaker
            .execute(|| async { Err::<(), _>("boom".to_string()) })
            .await;
        assert_eq!(breaker.state().await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let result = breaker.execute(|| async { Ok::<_, String>(42) }).await;
        assert!(matches!(result, Ok(42)));
        assert_eq!(breaker.state().await, BreakerState::Closed);
        assert_eq!(breaker.failure_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_half_open_trial_reopens_on_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(100));

        let _ = breaker
            .execute(|| async { Err::<(), _>("boom".to_string()) })
            .await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let result: Result<(), _> = breaker
            .execute(|| async { Err::<(), _>("still broken".to_string()) })
            .await;
        assert!(matches!(result, Err(BreakerError::Inner(_))));
        assert_eq!(breaker.state().await, BreakerState::Open);
    }
}
