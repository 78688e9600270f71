//! Retry policy for oracle calls.
//!
//! Linear backoff for transient failures (`step × attempt`), a flat delay for
//! everything else. No jitter, no circuit breaker.

use std::time::Duration;

use thiserror::Error;

use super::{OracleError, OracleErrorKind};

/// Linear backoff step for rate limits, server errors and transport errors.
const TRANSIENT_STEP_SECS: u64 = 15;

/// Flat delay after any other failure.
const FLAT_DELAY_SECS: u64 = 2;

/// How many times to try a call and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub transient_step: Duration,
    pub flat_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            transient_step: Duration::from_secs(TRANSIENT_STEP_SECS),
            flat_delay: Duration::from_secs(FLAT_DELAY_SECS),
        }
    }

    /// Delay after failed attempt number `attempt` (1-indexed).
    pub fn delay_for(&self, kind: OracleErrorKind, attempt: u32) -> Duration {
        if kind.is_transient() {
            self.transient_step * attempt.max(1)
        } else {
            self.flat_delay
        }
    }
}

/// Blocking wait between attempts. Injected so tests never really sleep.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// The retry budget was spent without a successful attempt.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: OracleError,
}

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// `op` receives the 1-indexed attempt number. Every failure is followed by
/// the policy's delay, including the last one.
pub fn call_with_retry<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut op: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Result<T, OracleError>,
{
    let mut last_error = OracleError::Other("no attempts were made".into());
    let attempts = policy.max_attempts;

    for attempt in 1..=attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                let delay = policy.delay_for(e.kind(), attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    delay_secs = delay.as_secs_f32(),
                    "Oracle call failed"
                );
                sleeper.sleep(delay);
                last_error = e;
            }
        }
    }

    Err(RetryExhausted {
        attempts,
        last_error,
    })
}
