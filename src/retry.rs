use std::time::Duration;

use rand::Rng;

use crate::config::RetrySection;
use crate::error::{AgentError, Result};
use crate::heartbeat::{HeartbeatClient, HeartbeatOutcome};

/// Bounded exponential backoff with randomized jitter, wrapped around the
/// heartbeat send. Each heartbeat cycle restarts from attempt 1; nothing is
/// carried across cycles.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_jitter,
        }
    }

    pub fn from_config(retry: &RetrySection) -> Self {
        Self::new(
            retry.attempts,
            Duration::from_secs(retry.delay_in_seconds),
            Duration::from_secs(retry.max_jitter_in_seconds),
        )
    }

    /// Base delay component before attempt `failed_attempt + 1`:
    /// `base_delay * 2^(failed_attempt - 1)` for `failed_attempt >= 1`.
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Uniform random jitter in `[0, max_jitter]`, applied in full on top of
    /// the backoff delay; never capped.
    pub fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Attempt the heartbeat up to `max_attempts` times.
    ///
    /// Authentication rejections short-circuit immediately: they are not
    /// transient, so no further attempts occur. Every other failure kind is
    /// retried until attempts are exhausted; the final attempt is followed by
    /// no delay.
    pub async fn run(&self, client: &HeartbeatClient) -> Result<HeartbeatOutcome> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            tracing::debug!(attempt, max_attempts = self.max_attempts, "Heartbeat attempt");

            match client.send().await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if attempt < self.max_attempts {
                        let delay = self.backoff_delay(attempt) + self.jitter();
                        tracing::warn!(
                            error = %err,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Heartbeat failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        tracing::error!(
            attempts = self.max_attempts,
            "Heartbeat failed after all attempts"
        );
        Err(last_error
            .unwrap_or_else(|| AgentError::Network("no heartbeat attempts were made".to_string())))
    }
}
