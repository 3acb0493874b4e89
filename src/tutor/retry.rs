//! Exponential backoff around collaborator calls.

#![allow(missing_docs)]

use std::time::Duration;

use crate::core::config::RetryConfig;
use crate::core::errors::{Result, TutorError};

/// How many times to try, how long to wait, and which failures qualify.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    retryable: fn(&TutorError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay(),
            multiplier: config.multiplier,
            retryable: TutorError::is_retryable,
        }
    }

    /// Replace the predicate deciding which errors are retried.
    #[must_use]
    pub fn with_predicate(mut self, retryable: fn(&TutorError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Wait before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.initial_delay
            .mul_f64(self.multiplier.powi(exponent).min(f64::from(u32::MAX)))
    }

    /// Run `op` with the real clock.
    pub fn execute<T>(&self, op: impl FnMut() -> Result<T>) -> Result<T> {
        self.execute_with(op, std::thread::sleep)
    }

    /// Run `op`, retrying qualifying failures with `sleep` between attempts.
    /// The last error is returned once attempts are exhausted.
    pub fn execute_with<T>(
        &self,
        mut op: impl FnMut() -> Result<T>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && (self.retryable)(&err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying model request"
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limited() -> TutorError {
        TutorError::RateLimited { retry_after: None }
    }

    #[test]
    fn default_policy_is_five_attempts_doubling_from_five_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(4), Duration::from_secs(40));
    }

    #[test]
    fn retries_rate_limits_until_success() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let mut slept = Vec::new();
        let result = policy.execute_with(
            || {
                calls += 1;
                if calls < 3 { Err(rate_limited()) } else { Ok("answer") }
            },
            |d| slept.push(d),
        );
        assert_eq!(result.unwrap(), "answer");
        assert_eq!(calls, 3);
        assert_eq!(slept, [Duration::from_secs(5), Duration::from_secs(10)]);
    }

    #[test]
    fn gives_up_after_max_attempts_with_last_error() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let mut sleeps = 0;
        let err = policy
            .execute_with(
                || -> Result<()> {
                    calls += 1;
                    Err(rate_limited())
                },
                |_| sleeps += 1,
            )
            .unwrap_err();
        assert_eq!(err.code(), "TUT-4001");
        assert_eq!(calls, 5);
        assert_eq!(sleeps, 4);
    }

    #[test]
    fn non_retryable_errors_propagate_immediately() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let err = policy
            .execute_with(
                || -> Result<()> {
                    calls += 1;
                    Err(TutorError::ModelApi {
                        status: Some(400),
                        message: "bad".to_string(),
                    })
                },
                |_| panic!("must not sleep"),
            )
            .unwrap_err();
        assert_eq!(err.code(), "TUT-4002");
        assert_eq!(calls, 1);
    }

    #[test]
    fn custom_predicate_and_config_are_honoured() {
        let config = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 1_000,
            multiplier: 3.0,
        };
        let policy = RetryPolicy::from_config(&config).with_predicate(|_| true);
        let mut calls = 0;
        let mut slept = Vec::new();
        let _ = policy.execute_with(
            || -> Result<()> {
                calls += 1;
                Err(TutorError::Runtime {
                    details: "flaky".to_string(),
                })
            },
            |d| slept.push(d),
        );
        assert_eq!(calls, 2);
        assert_eq!(slept, [Duration::from_secs(1)]);
        assert_eq!(policy.delay_for(3), Duration::from_secs(9));
    }
}
