//! Retry policy for provider calls

use std::time::Duration;

use http::StatusCode;
use rand::Rng;

/// Bounded exponential backoff with optional jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,

    /// Randomize each delay within `[delay / 2, delay]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Transient provider statuses
    ///
    /// 501 means the endpoint does not exist, so it is not retried.
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
            || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    }

    /// Transient transport failures
    pub fn is_retryable_error(&self, err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = calc_exp_backoff(self, attempt.saturating_sub(1));
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let secs = delay.as_secs_f64();
        Duration::from_secs_f64(rand::thread_rng().gen_range(secs / 2.0..=secs))
    }
}

/// Calculate exponential backoff delay
pub fn calc_exp_backoff(policy: &RetryPolicy, retry: u32) -> Duration {
    let delay_secs = policy.base_delay.as_secs_f64() * policy.multiplier.powi(retry as i32);
    let capped_delay = delay_secs.min(policy.max_delay.as_secs_f64());
    Duration::from_secs_f64(capped_delay)
}
