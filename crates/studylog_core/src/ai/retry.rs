//! Exponential-backoff retry for remote generation calls, built on `backon`.
//!
//! # Invariants
//! - At most `max_attempts` calls are made; the last error is returned.
//! - Non-retryable errors return immediately without sleeping.
//! - Waits grow as `initial_wait · multiplier^n` between attempts, without
//!   jitter.

use crate::ai::client::AiError;
use crate::logging::{sanitize_message, MAX_LOGGED_ERROR_CHARS};
use backon::{BlockingRetryable, BlockingSleeper, ExponentialBuilder};
use log::warn;
use std::cell::Cell;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (0-based).
    pub fn wait_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.initial_wait.saturating_mul(factor)
    }

    /// Backoff schedule equivalent to [`RetryPolicy::wait_after`].
    pub fn backoff(&self) -> ExponentialBuilder {
        let retries = self.max_attempts.max(1) - 1;
        ExponentialBuilder::default()
            .with_min_delay(self.initial_wait)
            .with_max_delay(self.wait_after(retries))
            .with_factor(self.multiplier.max(1) as f32)
            .with_max_times(retries as usize)
    }
}

/// Default blocking pause between attempts.
pub fn thread_sleep(duration: Duration) {
    std::thread::sleep(duration);
}

/// Runs `operation` until it succeeds, fails permanently, or attempts run out.
///
/// `operation` receives the 0-based attempt number. `sleeper` performs the
/// waits, so tests can record them instead of sleeping.
pub fn call_with_retry<T, S, F>(
    policy: &RetryPolicy,
    sleeper: S,
    mut operation: F,
) -> Result<T, AiError>
where
    S: BlockingSleeper,
    F: FnMut(u32) -> Result<T, AiError>,
{
    let attempts = policy.max_attempts.max(1);
    let attempt = Cell::new(0u32);
    let call = || {
        let current = attempt.get();
        attempt.set(current + 1);
        operation(current)
    };
    call.retry(policy.backoff())
        .sleep(sleeper)
        .when(AiError::is_retryable)
        .notify(|err: &AiError, wait: Duration| {
            warn!(
                "event=ai_retry module=ai status=error code={} attempt={}/{} wait_ms={} detail={}",
                err.code(),
                attempt.get(),
                attempts,
                wait.as_millis(),
                sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
            );
        })
        .call()
}

#[cfg(test)]
mod tests {
    use super::{call_with_retry, RetryPolicy};
    use crate::ai::client::AiError;
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn waits_grow_geometrically() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.wait_after(0), Duration::from_secs(1));
        assert_eq!(policy.wait_after(1), Duration::from_secs(2));
        assert_eq!(policy.wait_after(2), Duration::from_secs(4));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let waits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&waits);
        let sleeper = move |duration: Duration| {
            recorded.lock().expect("wait log lock").push(duration);
        };
        let result = call_with_retry(&RetryPolicy::default(), sleeper, |attempt| {
            if attempt < 2 {
                Err(AiError::Timeout)
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(2));
        assert_eq!(
            *waits.lock().expect("wait log lock"),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn longer_policies_keep_the_multiplier() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_wait: Duration::from_secs(1),
            multiplier: 3,
        };
        let waits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&waits);
        let result: Result<(), AiError> = call_with_retry(
            &policy,
            move |duration: Duration| recorded.lock().expect("wait log lock").push(duration),
            |_| Err(AiError::Timeout),
        );
        assert_eq!(result, Err(AiError::Timeout));
        assert_eq!(
            *waits.lock().expect("wait log lock"),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(9)
            ]
        );
    }

    #[test]
    fn returns_last_error_when_attempts_run_out() {
        let calls = RefCell::new(0);
        let result: Result<(), AiError> =
            call_with_retry(&RetryPolicy::default(), |_: Duration| {}, |attempt| {
                *calls.borrow_mut() += 1;
                Err(AiError::Server(format!("attempt {attempt}")))
            });
        assert_eq!(result, Err(AiError::Server("attempt 2".to_string())));
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = RefCell::new(0);
        let result: Result<(), AiError> =
            call_with_retry(&RetryPolicy::default(), |_: Duration| {}, |_| {
                *calls.borrow_mut() += 1;
                Err(AiError::Authentication("bad key".to_string()))
            });
        assert!(matches!(result, Err(AiError::Authentication(_))));
        assert_eq!(*calls.borrow(), 1);
    }
}
