//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use hackmeta_store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

use crate::config::millis;

/// Exponential backoff policy for transient storage failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Total attempts, the first one included. Zero behaves as one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Whether another attempt follows failed attempt `attempt` (0-indexed).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Run `attempt_fn` until it succeeds, fails permanently, or the policy
    /// is exhausted. Each attempt is bounded by `timeout`; an expired attempt
    /// counts as a transient [`StoreError::Timeout`].
    pub async fn run<T, F, Fut>(&self, operation: &str, timeout: Duration, mut attempt_fn: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(timeout, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    operation: operation.to_string(),
                    after: timeout,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && self.should_retry(attempt) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying storage request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
