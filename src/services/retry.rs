//! Attempt budget and linear backoff for scheme fetches.

use std::time::Duration;

use crate::models::FetchConfig;

/// How often a scheme fetch is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay_unit: Duration,
}

impl RetryPolicy {
    /// `attempts` is clamped to at least one.
    pub fn new(attempts: u32, delay_unit: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay_unit,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.retry_count, config.retry_delay())
    }

    /// Total attempts, including the first.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pause after failed attempt `attempt` (1-based), or `None` after the last.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.attempts).then(|| self.delay_unit.saturating_mul(attempt))
    }
}
