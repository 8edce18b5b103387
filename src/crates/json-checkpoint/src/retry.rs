//! Retry logic with exponential backoff for table loads
//!
//! Loads that fail with an I/O or decode error are retried a bounded number of
//! times. Saves are never retried: a save rewrites the whole file, and
//! repeating a failed one could clobber data that is already durable.

use crate::error::Result;
use crate::table::{Table, TableStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first
    pub max_attempts: usize,

    /// Delay before the second attempt (in milliseconds)
    pub initial_delay_ms: u64,

    /// Maximum delay between attempts (in milliseconds)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (e.g., 2.0 for doubling)
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_attempts: usize, initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// A single attempt, no retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate the delay after failed attempt `attempt` (0-indexed)
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64) * self.multiplier.powi(attempt as i32);
        let capped_delay = delay_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(capped_delay as u64)
    }
}

/// Execute `operation`, retrying transient failures.
///
/// Only errors for which [`CheckpointError::is_transient`](crate::CheckpointError::is_transient) holds are retried;
/// anything else is returned at once. When attempts run out, the error from
/// the final attempt is returned unchanged.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, op_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(operation = %op_name, attempt = attempt + 1, "Retry succeeded");
                }
                return Ok(result);
            }
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let delay = config.calculate_delay(attempt);
                warn!(
                    operation = %op_name,
                    attempt = attempt + 1,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(
                        operation = %op_name,
                        attempt = attempt + 1,
                        error = %e,
                        "Operation failed, max attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// [`TableStore`] decorator that retries loads
#[derive(Debug, Clone)]
pub struct RetryingTable<T> {
    inner: T,
    config: RetryConfig,
}

impl<T: TableStore> RetryingTable<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<T: TableStore> TableStore for RetryingTable<T> {
    async fn load(&self) -> Result<Table> {
        with_retry(&self.config, "load", || self.inner.load()).await
    }

    async fn save(&self, table: &Table) -> Result<()> {
        self.inner.save(table).await
    }
}
