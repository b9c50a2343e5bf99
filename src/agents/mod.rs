//! Language-model agents.
//!
//! Agents turn derived match summaries into natural-language output. All
//! agents implement the `Agent` trait.

pub mod backend;
pub mod coach;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during agent execution.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("AI backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("AI response unparseable: {0}")]
    ResponseParseError(String),

    #[error("AI returned no usable content: {0}")]
    ExtractionRefused(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl AgentError {
    /// Whether retrying the same request can help.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgentError::BackendUnavailable(_) | AgentError::Timeout(_) | AgentError::RateLimited(_)
        )
    }
}

/// Retry policy for agents.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out.
///
/// Rate-limit errors wait for the server-provided delay instead of backoff.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = match e {
                    AgentError::RateLimited(secs) => Duration::from_secs(secs),
                    _ => policy.delay_for(attempt),
                };
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Core trait for all agents.
#[async_trait]
pub trait Agent {
    type Input;
    type Output;

    /// Agent identifier for logging.
    fn name(&self) -> &'static str;

    /// Execute the agent's task.
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, AgentError>;

    /// Retry policy for this agent.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay_ms: 1,
            backoff_multiplier: 1.0,
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay_ms, 1000);
    }

    #[test]
    fn test_retry_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_transient_errors() {
        assert!(AgentError::Timeout("slow".to_string()).is_transient());
        assert!(AgentError::RateLimited(5).is_transient());
        assert!(!AgentError::ResponseParseError("bad".to_string()).is_transient());
    }

    #[tokio::test]
    async fn test_with_retry_recovers() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = with_retry(&fast_policy(3), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AgentError::BackendUnavailable("down".to_string()))
            } else {
                Ok("feedback")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "feedback");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = with_retry(&fast_policy(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AgentError::BackendUnavailable("down".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> =
            tokio_test::block_on(with_retry(&fast_policy(3), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AgentError::ResponseParseError("garbage".to_string()))
            }));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
