// ABOUTME: Backoff policy for readiness probing
// ABOUTME: Linear growth from a base delay, capped, never giving up

use imagetrace_core::ReadinessConfig;
use std::time::Duration;

/// Delay schedule between failed readiness probes.
///
/// The probe retries forever; only the wait grows. This is deliberately a
/// separate type from the job tracker's `FailFastPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessBackoff {
    base: Duration,
    step: Duration,
    max: Duration,
}

impl Default for ReadinessBackoff {
    fn default() -> Self {
        Self::from_config(&ReadinessConfig::default())
    }
}

impl ReadinessBackoff {
    pub fn new(base: Duration, step: Duration, max: Duration) -> Self {
        Self {
            base,
            step,
            max: max.max(base),
        }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.delay_step_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Wait before the next probe after `consecutive_failures` failures in a
    /// row. The first failure waits `base`.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        let steps = consecutive_failures.saturating_sub(1);
        self.base
            .saturating_add(self.step.saturating_mul(steps))
            .min(self.max)
    }
}
