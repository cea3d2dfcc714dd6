//! Exponential backoff between modeling attempts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::OrchestratorConfig;

/// Unjittered exponential backoff: `base^retries` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: u32,
    unit: Duration,
}

/// How a backoff wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

impl BackoffPolicy {
    pub fn new(base: u32, unit: Duration) -> Self {
        Self { base, unit }
    }

    /// Number of units to wait before the attempt that follows `retries`
    /// prior rejections (counting from zero).
    pub fn delay_units(&self, retries: u32) -> u64 {
        u64::from(self.base).saturating_pow(retries)
    }

    /// Wall-clock delay for `retries`.
    pub fn delay(&self, retries: u32) -> Duration {
        let units = u32::try_from(self.delay_units(retries)).unwrap_or(u32::MAX);
        self.unit.saturating_mul(units)
    }

    /// Sleeps for `delay(retries)` unless `token` is cancelled first.
    ///
    /// A token that is already cancelled returns immediately.
    pub async fn wait(&self, retries: u32, token: &CancellationToken) -> WaitOutcome {
        if token.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        tokio::select! {
            _ = token.cancelled() => WaitOutcome::Cancelled,
            _ = tokio::time::sleep(self.delay(retries)) => WaitOutcome::Elapsed,
        }
    }
}

impl From<&OrchestratorConfig> for BackoffPolicy {
    fn from(config: &OrchestratorConfig) -> Self {
        Self::new(config.backoff_base, config.backoff_unit)
    }
}
