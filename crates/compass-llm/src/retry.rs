//! Retry with exponential backoff
//!
//! A call wrapper usable around any fallible async operation. Failures are
//! classified by a caller-supplied function:
//!
//! - generic transient failures grow the delay by 2x
//! - rate-limit failures grow it by 4x
//! - permanent failures stop immediately
//!
//! Delays are capped at `max_delay_ms` and optionally multiplied by a random
//! jitter factor in `[0.5, 1.5]`.

use compass_domain::FailureKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Growth factor for generic transient failures
pub const TRANSIENT_FACTOR: u32 = 2;

/// Growth factor for rate-limit failures
pub const RATE_LIMIT_FACTOR: u32 = 4;

/// How a failure should be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Throttling; back off steeply
    RateLimited,
    /// Timeout or temporary outage
    Transient,
    /// Not worth retrying
    Permanent,
}

impl From<FailureKind> for RetryClass {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Transient { rate_limited: true } => RetryClass::RateLimited,
            FailureKind::Transient { rate_limited: false } => RetryClass::Transient,
            _ => RetryClass::Permanent,
        }
    }
}

/// Backoff parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay the backoff grows from (milliseconds)
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Multiply each delay by a random factor in [0.5, 1.5]
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Initial delay as a Duration
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Maximum delay as a Duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("max_delay_ms cannot be less than initial_delay_ms".to_string());
        }
        Ok(())
    }

    /// Pre-jitter delay following `previous` for a failure of `class`
    ///
    /// `min(max_delay, previous * 2)` for transient failures and
    /// `min(max_delay, previous * 4)` for rate limits. Permanent failures are
    /// not retried and get a zero delay.
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_llm::{RetryClass, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy { max_retries: 5, initial_delay_ms: 100, max_delay_ms: 1_000, jitter: false };
    /// let prev = Duration::from_millis(100);
    /// assert_eq!(policy.next_delay(prev, RetryClass::Transient), Duration::from_millis(200));
    /// assert_eq!(policy.next_delay(prev, RetryClass::RateLimited), Duration::from_millis(400));
    /// assert_eq!(policy.next_delay(Duration::from_millis(800), RetryClass::Transient), Duration::from_millis(1_000));
    /// ```
    pub fn next_delay(&self, previous: Duration, class: RetryClass) -> Duration {
        let factor = match class {
            RetryClass::Transient => TRANSIENT_FACTOR,
            RetryClass::RateLimited => RATE_LIMIT_FACTOR,
            RetryClass::Permanent => return Duration::ZERO,
        };
        previous
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_delay())
    }

    /// Pre-jitter delays for a run of consecutive failures
    pub fn schedule(&self, failures: &[RetryClass]) -> Vec<Duration> {
        let mut previous = self.initial_delay();
        failures
            .iter()
            .map(|class| {
                previous = self.next_delay(previous, *class);
                previous
            })
            .collect()
    }

    /// Apply jitter to a delay, if enabled
    pub fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.5);
        delay.mul_f64(factor)
    }
}

/// Terminal outcome of a retried operation
#[derive(Error, Debug)]
pub enum RetryError<E: fmt::Display> {
    /// Every allowed attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last: E,
    },

    /// An attempt failed with an error that is not worth retrying
    #[error("permanent failure on attempt {attempt}: {error}")]
    Permanent {
        /// Attempt that failed
        attempt: u32,
        /// The error
        error: E,
    },
}

impl<E: fmt::Display> RetryError<E> {
    /// The underlying error
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent { error, .. } => error,
        }
    }

    /// Attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Permanent { attempt, .. } => *attempt,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out
///
/// `operation` receives the 1-based attempt number. `classify` decides how
/// each failure is retried.
///
/// # Examples
///
/// ```
/// use compass_llm::{retry_with_backoff, RetryClass, RetryPolicy};
///
/// # async fn example() {
/// let policy = RetryPolicy { max_retries: 2, initial_delay_ms: 1, max_delay_ms: 10, jitter: false };
/// let result: Result<u32, _> = retry_with_backoff(
///     &policy,
///     |attempt| async move { if attempt < 2 { Err("flaky") } else { Ok(attempt) } },
///     |_| RetryClass::Transient,
/// )
/// .await;
/// assert_eq!(result.unwrap(), 2);
/// # }
/// ```
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    mut operation: F,
    classify: C,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryClass,
{
    let mut delay = policy.initial_delay();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let class = classify(&error);
        if class == RetryClass::Permanent {
            return Err(RetryError::Permanent { attempt, error });
        }
        if attempt >= policy.max_attempts() {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        delay = policy.next_delay(delay, class);
        let sleep_for = policy.jittered(delay);
        warn!(
            attempt,
            max_attempts = policy.max_attempts(),
            delay_ms = sleep_for.as_millis() as u64,
            class = ?class,
            error = %error,
            "Attempt failed, backing off"
        );
        tokio::time::sleep(sleep_for).await;
    }
}
