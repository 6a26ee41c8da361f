//! Bounded retry for document writes.
//!
//! Delays grow exponentially and carry random jitter so that many writers
//! failing together do not retry in lockstep.

use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use tracing::{debug, warn};

use gitsync_search::StoreError;
use gitsync_types::IndexingSettings;

/// Retry schedule for a single document write.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Jitter as a fraction of the current delay
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&IndexingSettings::default())
    }
}

/// A write that failed every attempt, or failed permanently.
#[derive(Debug)]
pub struct RetryFailure {
    pub attempts: u32,
    pub error: StoreError,
}

impl RetryPolicy {
    pub fn from_settings(settings: &IndexingSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            multiplier: 2.0,
            randomization_factor: 0.5,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: self.randomization_factor,
            multiplier: self.multiplier,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. Only transient store errors are retried.
    pub async fn run<T, F, Fut>(&self, doc_id: &str, mut operation: F) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut backoff = self.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(doc_id, attempts, "Write succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !error.is_transient() || attempts >= self.max_attempts {
                        return Err(RetryFailure { attempts, error });
                    }
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!(
                                doc_id,
                                attempt = attempts,
                                error = %error,
                                retry_in_ms = delay.as_millis() as u64,
                                "Document write failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(RetryFailure { attempts, error }),
                    }
                }
            }
        }
    }
}
