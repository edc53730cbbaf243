use async_trait::async_trait;
use imagetrace_core::{AnalysisJobId, HashType};

use crate::error::ClientError;
use crate::wire::{HealthResponse, JobStatusResponse, SubmitResponse};

/// Operations the orchestration layer consumes from the analysis backend.
///
/// Implementations must be cheap to share behind an `Arc`; the readiness probe
/// and the job tracker call into the same client from spawned tasks.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Probe backend health. Any error counts as unreachable.
    async fn check_health(&self) -> Result<HealthResponse, ClientError>;

    /// Start an analysis of every image in `project_id`
    async fn submit_analysis(
        &self,
        project_id: &str,
        hash_type: HashType,
    ) -> Result<SubmitResponse, ClientError>;

    /// Fetch the current status of a job. Completed jobs carry their result.
    async fn get_job_status(&self, job_id: &AnalysisJobId)
        -> Result<JobStatusResponse, ClientError>;
}
