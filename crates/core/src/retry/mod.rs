//! Bounded, classified retry for external collaborator calls.
//!
//! Every network-facing stage of the pipeline runs its collaborator call
//! through a [`RetryPolicy`]. The caller classifies each attempt's outcome:
//! transient transport failures, "job still running" poll responses and
//! invalid-but-regenerable replies are all [`Classified::Retryable`] and
//! share one attempt budget; an explicit failure response is
//! [`Classified::Fatal`] and surfaces immediately. There are no unbounded
//! polling loops anywhere in the pipeline.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Outcome of a single attempt, as judged by the caller.
#[derive(Debug)]
pub enum Classified<T> {
    /// The call succeeded with this value.
    Success(T),
    /// Transient condition; retry if the attempt budget allows.
    Retryable(String),
    /// Unrecoverable; surface immediately without further attempts.
    Fatal(String),
}

/// Terminal failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt was retryable and the budget ran out.
    #[error("{label}: gave up after {attempts} attempts: {last_reason}")]
    Exhausted {
        label: String,
        attempts: u32,
        last_reason: String,
    },

    /// An attempt was classified fatal.
    #[error("{label}: {reason}")]
    Fatal { label: String, reason: String },
}

/// Retry settings for one collaborator class. Scrape, generation,
/// synthesis-polling and upload calls get separate sections because their
/// cost and latency profiles differ.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    3_000
}

/// Runs an operation up to a fixed number of attempts with a fixed sleep
/// between retryable failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A maximum of zero attempts is clamped to one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Drives `op` until it succeeds, fails fatally, or the attempt budget
    /// is exhausted. The 1-based attempt number is passed to `op`.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Classified<T>>,
    {
        let mut last_reason = String::new();
        for attempt in 1..=self.max_attempts {
            match op(attempt).await {
                Classified::Success(value) => return Ok(value),
                Classified::Retryable(reason) => {
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        %reason,
                        "attempt failed"
                    );
                    last_reason = reason;
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Classified::Fatal(reason) => {
                    return Err(RetryError::Fatal {
                        label: label.to_string(),
                        reason,
                    })
                }
            }
        }
        Err(RetryError::Exhausted {
            label: label.to_string(),
            attempts: self.max_attempts,
            last_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = immediate(5)
            .execute("op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Classified::Success(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_after_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = immediate(4)
            .execute("op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Classified::Retryable("still running".to_string()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result.unwrap_err() {
            RetryError::Exhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fatal_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = immediate(10)
            .execute("op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Classified::Fatal("bad credentials".to_string()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), RetryError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_recovers_mid_budget() {
        let result = immediate(5)
            .execute("op", |attempt| async move {
                if attempt < 3 {
                    Classified::Retryable("flaky".to_string())
                } else {
                    Classified::Success(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_clamps_to_one() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = immediate(0)
            .execute("op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Classified::Retryable("nope".to_string()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
