use imagetrace_client::ClientError;
use imagetrace_core::PollingConfig;

use super::listener::JobFailure;

/// Failure handling for job status polling.
///
/// Unlike readiness probing, a fetch error here ends polling at once: a job
/// status request that cannot be answered means the session is broken, not
/// that a dependency is still starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailFastPolicy {
    default_failure_message: String,
}

impl Default for FailFastPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl FailFastPolicy {
    pub fn new(default_failure_message: impl Into<String>) -> Self {
        Self {
            default_failure_message: default_failure_message.into(),
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.default_failure_message.clone())
    }

    /// A fetch error is terminal; there is no retry path.
    pub fn on_fetch_error(&self, error: ClientError) -> JobFailure {
        JobFailure::Transport(error)
    }

    /// Backend-reported failure, falling back to the default message
    pub fn on_job_failed(&self, message: Option<String>) -> JobFailure {
        JobFailure::BackendJobFailed(
            message.unwrap_or_else(|| self.default_failure_message.clone()),
        )
    }
}
