use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use embedline_core::error::{ClientError, Result};
use embedline_core::vector::EmbeddingVector;

use crate::client::EmbeddingClient;

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause after each failed attempt except the last.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Execute an async operation, retrying failures according to `policy`.
///
/// The closure receives the 1-based attempt number. The last error is
/// returned once all attempts have failed.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, f: F) -> std::result::Result<T, E>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(attempt, max_attempts, error = %e, "request failed, retrying");
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "request failed, giving up");
                return Err(e);
            }
        }
    }
}

/// Wraps any [`EmbeddingClient`] with bounded retries.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: EmbeddingClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: EmbeddingClient> EmbeddingClient for RetryingClient<C> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        with_retry(&self.policy, |_| self.inner.embed(texts))
            .await
            .map_err(|e| {
                ClientError::RetriesExhausted {
                    attempts: self.policy.attempts(),
                    last: e.to_string(),
                }
                .into()
            })
    }
}
