//! Retry and pacing policy for crawl workers.

use rand::Rng;
use std::time::Duration;

use crate::error::FetchError;
use crate::types::config::CrawlConfig;

/// Transient failures are retried with linear backoff; permanent ones never.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_step: Duration) -> Self {
        Self {
            max_retries,
            backoff_step,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_backoff_ms))
    }

    /// Whether retry number `attempt` (1-based) is allowed after `err`.
    pub fn should_retry(&self, err: &FetchError, attempt: u32) -> bool {
        err.is_transient() && attempt <= self.max_retries
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Randomise `base` within `[base × (1 − jitter), base × (1 + jitter)]`.
pub fn jittered(base: Duration, jitter: f64) -> Duration {
    let jitter = jitter.clamp(0.0, 1.0);
    if base.is_zero() || jitter == 0.0 {
        return base;
    }
    let secs = base.as_secs_f64();
    let low = secs * (1.0 - jitter);
    let high = secs * (1.0 + jitter);
    Duration::try_from_secs_f64(rand::thread_rng().gen_range(low..=high)).unwrap_or(base)
}
