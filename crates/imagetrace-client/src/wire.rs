// Request/response shapes exchanged with the analysis backend.

use imagetrace_core::{AnalysisJobId, SimilarityMatrix};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::status::JobStatus;

/// Body of `GET /health/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl HealthResponse {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }

    /// Only "ok" and "healthy" count as reachable; a missing status does not
    pub fn is_reachable(&self) -> bool {
        matches!(self.status.as_deref(), Some("ok") | Some("healthy"))
    }
}

/// Body of `POST /analysis/start`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl SubmitResponse {
    pub fn for_job(job_id: &AnalysisJobId) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            ..Default::default()
        }
    }

    /// Status is keyed by `analysis_id`; older backends only send `job_id`
    /// or `task_id`.
    pub fn job_id(&self) -> Result<AnalysisJobId, ClientError> {
        let raw = self
            .analysis_id
            .as_deref()
            .or(self.job_id.as_deref())
            .or(self.task_id.as_deref())
            .ok_or_else(|| {
                ClientError::InvalidPayload("submission response carries no job id".to_string())
            })?;
        AnalysisJobId::new(raw).map_err(|e| ClientError::InvalidPayload(e.to_string()))
    }
}

/// Body of `GET /analysis/status/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, alias = "error_message", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Either the matrix itself or an object holding `similarity_matrix`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl JobStatusResponse {
    pub fn pending() -> Self {
        Self::with_status("pending")
    }

    pub fn running(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::with_status("running")
        }
    }

    pub fn completed(matrix: &SimilarityMatrix) -> Self {
        Self {
            progress: Some(1.0),
            result: Some(serde_json::json!({ "similarity_matrix": matrix.rows() })),
            ..Self::with_status("completed")
        }
    }

    pub fn failed(message: Option<&str>) -> Self {
        Self {
            error: message.map(str::to_string),
            ..Self::with_status("failed")
        }
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Decode the wire payload into a `JobStatus`.
    ///
    /// Unknown status strings and completed jobs without a readable matrix are
    /// payload errors.
    pub fn into_status(self) -> Result<JobStatus, ClientError> {
        match self.status.as_str() {
            "pending" => Ok(JobStatus::Pending {
                progress: self.progress,
            }),
            "running" => Ok(JobStatus::Running {
                progress: self.progress,
            }),
            "completed" => {
                let result = self.result.ok_or_else(|| {
                    ClientError::InvalidPayload("completed job carries no result".to_string())
                })?;
                extract_matrix(result).map(JobStatus::Completed)
            }
            "failed" => Ok(JobStatus::Failed(
                self.error.filter(|message| !message.trim().is_empty()),
            )),
            other => Err(ClientError::InvalidPayload(format!(
                "unknown job status '{}'",
                other
            ))),
        }
    }
}

/// Accepts a bare `[[..]]` matrix or `{"similarity_matrix": [[..]]}`
pub fn extract_matrix(result: Value) -> Result<SimilarityMatrix, ClientError> {
    let matrix = match result {
        Value::Object(mut fields) => fields.remove("similarity_matrix").ok_or_else(|| {
            ClientError::InvalidPayload("result has no similarity_matrix".to_string())
        })?,
        other => other,
    };
    serde_json::from_value(matrix).map_err(|e| ClientError::Decode(e.to_string()))
}
