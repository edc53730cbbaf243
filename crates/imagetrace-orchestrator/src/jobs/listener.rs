use imagetrace_client::ClientError;
use imagetrace_core::{AnalysisJobId, SimilarityMatrix};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Why a tracked job ended without a result
#[derive(Error, Debug)]
pub enum JobFailure {
    /// The status fetch itself failed; polling stopped without retrying
    #[error("Job status fetch failed: {0}")]
    Transport(#[from] ClientError),

    /// The backend reported the job as failed
    #[error("{0}")]
    BackendJobFailed(String),
}

impl JobFailure {
    pub fn is_transport(&self) -> bool {
        matches!(self, JobFailure::Transport(_))
    }
}

/// Receives the single terminal outcome of each tracked job.
///
/// Callbacks run while the tracker holds its delivery gate, which is what
/// guarantees no callback for a superseded job. A listener may read the
/// tracker through a `JobTrackerHandle`; switching jobs must be handed off
/// instead (see `ChannelListener`).
pub trait JobListener: Send + Sync {
    fn on_terminal_success(&self, job_id: &AnalysisJobId, result: SimilarityMatrix);

    fn on_terminal_failure(&self, job_id: &AnalysisJobId, failure: JobFailure);
}

/// Terminal outcome as a value, for channel-based consumers
#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        job_id: AnalysisJobId,
        result: SimilarityMatrix,
    },
    Failed {
        job_id: AnalysisJobId,
        failure: JobFailure,
    },
}

impl JobOutcome {
    pub fn job_id(&self) -> &AnalysisJobId {
        match self {
            JobOutcome::Completed { job_id, .. } | JobOutcome::Failed { job_id, .. } => job_id,
        }
    }
}

/// `JobListener` that forwards outcomes over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<JobOutcome>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, outcome: JobOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!(target: "imagetrace::jobs", "Outcome receiver dropped");
        }
    }
}

impl JobListener for ChannelListener {
    fn on_terminal_success(&self, job_id: &AnalysisJobId, result: SimilarityMatrix) {
        self.forward(JobOutcome::Completed {
            job_id: job_id.clone(),
            result,
        });
    }

    fn on_terminal_failure(&self, job_id: &AnalysisJobId, failure: JobFailure) {
        self.forward(JobOutcome::Failed {
            job_id: job_id.clone(),
            failure,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_listener_forwards() {
        let (listener, mut rx) = ChannelListener::new();
        let id = AnalysisJobId::new("a-1").unwrap();

        listener.on_terminal_failure(&id, JobFailure::BackendJobFailed("boom".into()));
        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.job_id(), &id);
        assert!(matches!(
            outcome,
            JobOutcome::Failed { failure: JobFailure::BackendJobFailed(ref m), .. } if m == "boom"
        ));
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);
        let id = AnalysisJobId::new("a-1").unwrap();
        listener.on_terminal_success(&id, SimilarityMatrix::default());
    }
}
