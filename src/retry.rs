//! Bounded retries with exponential backoff and a per-attempt timeout.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::PipelineError;

/// Retry policy for one class of external call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,
    /// Upper bound on the delay between attempts (milliseconds)
    pub max_delay_ms: u64,
    /// Timeout applied to each individual attempt (milliseconds)
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            attempt_timeout_ms: 120_000,
        }
    }
}

impl RetryPolicy {
    pub fn provider() -> Self {
        Self {
            max_attempts: 5,
            ..Self::default()
        }
    }

    pub fn upload() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 60_000,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from the base delay.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Run `op` until it succeeds, fails fatally, or the attempt budget is spent.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let attempts = policy.max_attempts.max(1);
    let per_attempt = Duration::from_millis(policy.attempt_timeout_ms);
    let mut attempt = 0usize;

    loop {
        attempt += 1;
        let outcome = match timeout(per_attempt, op()).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout(format!(
                "{label} exceeded {}ms",
                policy.attempt_timeout_ms
            ))),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retryable failure, backing off"
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
