//! Retry policy for model calls.
//!
//! Every model call goes through [`call_with_retry`], which re-sends the same
//! request after a backoff delay when the error is transient (429, 5xx,
//! network timeouts, empty or malformed output). Permanent errors (bad
//! credentials, unknown model, invalid input) are returned on the first
//! failure.
//!
//! The policy is a value, not control flow: it can cap the number of
//! retries, the total time spent retrying, both, or neither.

use crate::error::{DigestError, Result};
use std::time::{Duration, Instant};
use tracing::warn;

/// Delay schedule between retries.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Exponential backoff with an upper bound.
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
        /// Scale each delay by a deterministic factor in `[0.6, 0.9]`.
        jitter: bool,
    },
}

impl Backoff {
    /// Calculate the delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let base = initial.as_secs_f64() * multiplier.powi(exponent);
                let capped = base.min(max.as_secs_f64());
                if *jitter {
                    // Deterministic jitter keyed on the attempt number; avoids
                    // pulling in an RNG.
                    let factor = match attempt % 4 {
                        0 => 0.75,
                        1 => 0.90,
                        2 => 0.60,
                        _ => 0.85,
                    };
                    Duration::from_secs_f64(capped * factor)
                } else {
                    Duration::from_secs_f64(capped)
                }
            }
        }
    }
}

/// How transient model-call failures are retried.
///
/// The default sleeps a fixed 40 seconds between retries, places no cap on
/// the number of retries, and gives up once 30 minutes have been spent on a
/// single call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// Maximum number of retries after the first failure. `None` = no cap.
    pub max_retries: Option<u32>,
    /// Maximum wall time spent on one call including delays. `None` = no cap.
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::Fixed(Duration::from_secs(40)),
            max_retries: None,
            max_elapsed: Some(Duration::from_secs(30 * 60)),
        }
    }
}

impl RetryPolicy {
    /// Retry forever with a fixed delay. A persistent outage blocks the
    /// caller indefinitely; wrap the pipeline in a deadline if that matters.
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(delay),
            max_retries: None,
            max_elapsed: None,
        }
    }

    /// Exponential backoff (500ms doubling up to 8s, jittered) with at most
    /// `retries` retries.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(500),
                max: Duration::from_secs(8),
                multiplier: 2.0,
                jitter: true,
            },
            max_retries: Some(retries),
            max_elapsed: None,
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self {
            backoff: Backoff::Fixed(Duration::ZERO),
            max_retries: Some(0),
            max_elapsed: None,
        }
    }

    /// Replace the backoff schedule.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Cap the number of retries.
    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Cap the wall time spent on a single call.
    pub fn with_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Whether another retry is allowed after `retries` retries, `elapsed`
    /// time so far, and a pending `delay`.
    pub fn allows_retry(&self, retries: u32, elapsed: Duration, delay: Duration) -> bool {
        if self.max_retries.is_some_and(|max| retries >= max) {
            return false;
        }
        match self.max_elapsed {
            Some(cap) => elapsed.saturating_add(delay) <= cap,
            None => true,
        }
    }
}

/// Details of a retry about to happen, passed to the observer of
/// [`call_with_retry`].
#[derive(Debug)]
pub struct RetryNotice<'a> {
    /// Label of the call being retried (e.g. `"generate"`).
    pub label: &'a str,
    /// 1-based number of the retry about to be made.
    pub retry: u32,
    pub delay: Duration,
    pub error: &'a DigestError,
}

/// Run `call`, retrying transient failures according to `policy`.
///
/// Permanent errors are returned unchanged after the first call. When the
/// policy runs out, the last transient error is wrapped in
/// [`DigestError::RetriesExhausted`]. `observer` is told about each retry
/// before the delay starts.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    observer: &(dyn Fn(&RetryNotice<'_>) + Send + Sync),
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let mut retries: u32 = 0;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                let delay = policy.backoff.delay_for_attempt(retries);
                let elapsed = start.elapsed();
                if !policy.allows_retry(retries, elapsed, delay) {
                    return Err(DigestError::RetriesExhausted {
                        attempts: retries.saturating_add(1),
                        elapsed,
                        last: Box::new(e),
                    });
                }
                retries = retries.saturating_add(1);
                warn!("Transient error in {label} (retry {retries}): {e}. Retrying in {delay:?}...");
                observer(&RetryNotice {
                    label,
                    retry: retries,
                    delay,
                    error: &e,
                });
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Observer for [`call_with_retry`] that does nothing.
pub fn ignore_retries(_: &RetryNotice<'_>) {}
