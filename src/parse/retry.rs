//! Retry loop with exponential backoff
//!
//! Each attempt runs under its own timeout. Rate limiting and network
//! failures back off `base * 2^(attempt - 1)` and try again; anything else
//! returns immediately. The sleep only suspends the calling task.

use std::future::Future;
use std::time::Duration;

use crate::config::ChunkingConfig;

use super::error::ParseError;

/// Upper bound on a server-provided `Retry-After`
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: config.backoff_base(),
            call_timeout: config.call_timeout(),
        }
    }

    /// Delay after the given failed attempt (1-based): 1x, 2x, 4x, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Result of a retried call plus what it took to get there
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, ParseError>,
    pub attempts: u32,
    /// Every backoff slept before a subsequent attempt
    pub backoffs: Vec<Duration>,
}

/// Run `call` until it succeeds, fails permanently or exhausts the policy
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut call: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ParseError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoffs = Vec::new();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(policy.call_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(ParseError::Timeout(policy.call_timeout.as_secs())),
        };

        let err = match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(call = %label, attempt = attempt, "Parse call succeeded after retry");
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    backoffs,
                };
            }
            Err(err) => err,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            tracing::warn!(
                call = %label,
                attempt = attempt,
                retryable = err.is_retryable(),
                error = %err,
                "Parse call failed"
            );
            return RetryOutcome {
                result: Err(err),
                attempts: attempt,
                backoffs,
            };
        }

        let mut delay = policy.backoff(attempt);
        if let Some(retry_after) = err.retry_after() {
            delay = delay.max(retry_after.min(MAX_RETRY_AFTER));
        }

        tracing::warn!(
            call = %label,
            attempt = attempt,
            max_attempts = max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying parse call after backoff"
        );

        backoffs.push(delay);
        tokio::time::sleep(delay).await;
    }
}
