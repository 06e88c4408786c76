// src/api/retry.rs

//! Backoff for transient failures and the separate GitHub rate-limit wait.
//!
//! Two distinct mechanisms live here:
//! - [`with_backoff`] retries transport failures and 429/5xx statuses with
//!   exponential delays, up to a fixed number of attempts.
//! - [`rate_limit_wait`] computes how long to sleep after a 403 "rate limit
//!   exceeded" response. Callers re-issue the same request afterwards; the wait
//!   never counts against the attempt budget.

use crate::constants::DEFAULT_MAX_ATTEMPTS;
use crate::errors::ApiError;
use backon::{BlockingRetryable, ExponentialBuilder};
use log::warn;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Exponential backoff parameters for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Builds the exponential backoff for this policy. The first attempt is
    /// not a retry, so `max_attempts - 1` retries follow it.
    pub fn into_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Blocks the current thread. Injected so tests never really sleep.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Wall-clock source, in Unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up. The last error is returned on exhaustion.
pub fn with_backoff<T, F>(
    policy: &RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    url: &str,
    op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Result<T, ApiError>,
{
    op.retry(policy.into_backoff())
        .sleep(move |delay: Duration| sleeper.sleep(delay))
        .when(ApiError::is_transient)
        .notify(|err: &ApiError, delay: Duration| {
            warn!("Retrying {} in {:?} after: {}", url, delay, err);
        })
        .call()
}

/// Whether a response is GitHub's primary rate-limit rejection.
pub fn is_rate_limited(status: u16, body: &str) -> bool {
    status == 403 && body.to_ascii_lowercase().contains("rate limit exceeded")
}

/// Sleep duration for a rate-limited response: `max(reset - now, 0) + 1` seconds.
///
/// A missing or unparsable `X-RateLimit-Reset` header counts as "already reset".
pub fn rate_limit_wait(reset_header: Option<&str>, now: u64) -> Duration {
    let reset = reset_header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    Duration::from_secs(reset.saturating_sub(now) + 1)
}
