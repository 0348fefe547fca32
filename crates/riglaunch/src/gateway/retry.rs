//! Retry loop for the destination endpoint.
//!
//! Rate-limited attempts wait `delay × (attempt index + 1)`; other retryable
//! failures wait the plain `delay` and only between attempts.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::error::GatewayError;

/// Classified result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    /// HTTP 429.
    RateLimited,
    /// Transport or decode failure; the next attempt may succeed.
    Failed(GatewayError),
    /// Ends the call without further attempts.
    Fatal(GatewayError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(10),
            Duration::from_secs(20),
            Duration::from_secs(40),
        ])
    }
}

impl RetryPolicy {
    /// One attempt per delay entry.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Runs `attempt` until it succeeds, hits a fatal error, or the attempts
    /// are exhausted. The last error encountered is returned on exhaustion.
    pub async fn run<F, Fut>(&self, mut attempt: F) -> Result<String, GatewayError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = AttemptOutcome>,
    {
        let mut last: Option<GatewayError> = None;
        let last_index = self.delays.len().saturating_sub(1);

        for (index, delay) in self.delays.iter().copied().enumerate() {
            match attempt(index).await {
                AttemptOutcome::Success(value) => {
                    debug!("Destination resolved on attempt {}", index + 1);
                    return Ok(value);
                }
                AttemptOutcome::RateLimited => {
                    let wait = delay * (index as u32 + 1);
                    warn!(
                        "Destination rate limited on attempt {}, waiting {:?}",
                        index + 1,
                        wait
                    );
                    last = Some(GatewayError::RateLimited);
                    tokio::time::sleep(wait).await;
                }
                AttemptOutcome::Fatal(e) => {
                    warn!("Destination attempt {} failed fatally: {}", index + 1, e);
                    return Err(e);
                }
                AttemptOutcome::Failed(e) => {
                    warn!("Destination attempt {} failed: {}", index + 1, e);
                    last = Some(e);
                    if index < last_index {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last.unwrap_or_else(|| {
            GatewayError::RequestFailed("no attempts configured".to_string())
        }))
    }
}
