// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classified retry loop with typed backoff
//!
//! Rate limits sleep a fixed wait, transients back off under the
//! configured schedule, fatals return immediately. Cancellation is
//! honored between attempts and during sleeps.

use lw_core::{ExecError, RetryClass, RetryConfig};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Result of a resilience run
#[derive(Debug)]
pub struct RunOutcome<T> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<ExecError>,
    /// Attempts actually started
    pub attempts: u32,
}

impl<T> RunOutcome<T> {
    fn success(value: T, attempts: u32) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            attempts,
        }
    }

    fn failure(error: Option<ExecError>, attempts: u32) -> Self {
        Self {
            success: false,
            value: None,
            error,
            attempts,
        }
    }
}

/// Retries an async operation under the configured policy
pub struct ResilienceRunner {
    config: RetryConfig,
    cancel: CancellationToken,
}

impl ResilienceRunner {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(config: RetryConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Run `op` up to `max_attempts` times. The closure receives the
    /// zero-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> RunOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExecError>>,
    {
        let max = self.config.max_attempts;
        let mut attempts = 0;
        for attempt in 0..max {
            if self.cancel.is_cancelled() {
                return RunOutcome::failure(Some(ExecError::Canceled), attempts);
            }
            attempts = attempt + 1;

            let error = match op(attempt).await {
                Ok(value) => return RunOutcome::success(value, attempts),
                Err(error) => error,
            };

            let class = error.retry_class(&self.config.retryable_errors);
            let last_attempt = attempt + 1 >= max;
            match class {
                RetryClass::Fatal => {
                    tracing::warn!(attempt, error = %error, "fatal error, giving up");
                    return RunOutcome::failure(Some(error), attempts);
                }
                _ if last_attempt => {
                    tracing::warn!(attempt, error = %error, "retry budget exhausted");
                    return RunOutcome::failure(Some(error), attempts);
                }
                RetryClass::RateLimit => {
                    let wait = self.config.rate_limit_wait();
                    tracing::info!(attempt, wait_ms = wait.as_millis() as u64, error = %error, "rate limited, sleeping");
                    if !self.sleep(wait).await {
                        return RunOutcome::failure(Some(ExecError::Canceled), attempts);
                    }
                }
                RetryClass::Transient => {
                    let delay = self.config.backoff_delay(attempt);
                    tracing::info!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "transient error, backing off");
                    if !self.sleep(delay).await {
                        return RunOutcome::failure(Some(ExecError::Canceled), attempts);
                    }
                }
            }
        }
        // Zero max_attempts: the operation never ran
        RunOutcome::failure(None, attempts)
    }

    /// Sleep unless canceled first. Returns false on cancellation.
    async fn sleep(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
#[path = "resilience_tests.rs"]
mod tests;
