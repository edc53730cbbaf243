#![allow(dead_code)]

use async_trait::async_trait;
use imagetrace_client::{
    BackendClient, ClientError, HealthResponse, JobStatusResponse, SubmitResponse,
};
use imagetrace_core::{AnalysisJobId, HashType, SimilarityMatrix};
use imagetrace_orchestrator::{JobFailure, JobListener};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// A scripted reply: resolve after `delay` with `reply`
pub struct Step<T> {
    pub delay: Duration,
    pub reply: Result<T, ClientError>,
}

impl<T> Step<T> {
    pub fn now(reply: Result<T, ClientError>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply,
        }
    }

    pub fn after(delay: Duration, reply: Result<T, ClientError>) -> Self {
        Self { delay, reply }
    }
}

pub fn transport_error() -> ClientError {
    ClientError::HttpStatus {
        status: 502,
        url: "http://backend/analysis/status".to_string(),
        body: "bad gateway".to_string(),
    }
}

/// Backend fake that replays scripted responses and records call times
/// relative to its creation on the (paused) tokio clock.
pub struct ScriptedBackend {
    origin: Instant,
    health: Mutex<VecDeque<Step<HealthResponse>>>,
    health_fallback: Mutex<Option<HealthResponse>>,
    statuses: Mutex<HashMap<String, VecDeque<Step<JobStatusResponse>>>>,
    submissions: Mutex<VecDeque<Result<SubmitResponse, ClientError>>>,
    health_calls: Mutex<Vec<Duration>>,
    status_calls: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            health: Mutex::new(VecDeque::new()),
            health_fallback: Mutex::new(None),
            statuses: Mutex::new(HashMap::new()),
            submissions: Mutex::new(VecDeque::new()),
            health_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_health(&self, step: Step<HealthResponse>) -> &Self {
        self.health.lock().push_back(step);
        self
    }

    /// Reply used once the health script runs out
    pub fn health_fallback(&self, reply: HealthResponse) -> &Self {
        *self.health_fallback.lock() = Some(reply);
        self
    }

    pub fn push_status(&self, job_id: &str, step: Step<JobStatusResponse>) -> &Self {
        self.statuses
            .lock()
            .entry(job_id.to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn push_submission(&self, reply: Result<SubmitResponse, ClientError>) -> &Self {
        self.submissions.lock().push_back(reply);
        self
    }

    pub fn health_calls(&self) -> Vec<Duration> {
        self.health_calls.lock().clone()
    }

    pub fn health_call_millis(&self) -> Vec<u128> {
        self.health_calls().iter().map(|d| d.as_millis()).collect()
    }

    pub fn status_calls(&self, job_id: &str) -> Vec<u128> {
        self.status_calls
            .lock()
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, at)| at.as_millis())
            .collect()
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn check_health(&self) -> Result<HealthResponse, ClientError> {
        self.health_calls.lock().push(self.origin.elapsed());
        let step = self.health.lock().pop_front();
        match step {
            Some(step) => {
                tokio::time::sleep(step.delay).await;
                step.reply
            }
            None => match self.health_fallback.lock().clone() {
                Some(reply) => Ok(reply),
                None => Err(transport_error()),
            },
        }
    }

    async fn submit_analysis(
        &self,
        _project_id: &str,
        _hash_type: HashType,
    ) -> Result<SubmitResponse, ClientError> {
        self.submissions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(transport_error()))
    }

    async fn get_job_status(
        &self,
        job_id: &AnalysisJobId,
    ) -> Result<JobStatusResponse, ClientError> {
        self.status_calls
            .lock()
            .push((job_id.to_string(), self.origin.elapsed()));
        let step = self
            .statuses
            .lock()
            .get_mut(job_id.as_str())
            .and_then(VecDeque::pop_front);
        match step {
            Some(step) => {
                tokio::time::sleep(step.delay).await;
                step.reply
            }
            None => Ok(JobStatusResponse::pending()),
        }
    }
}

/// Listener that records every callback
#[derive(Default)]
pub struct RecordingListener {
    pub successes: Mutex<Vec<(AnalysisJobId, SimilarityMatrix)>>,
    pub failures: Mutex<Vec<(AnalysisJobId, JobFailure)>>,
}

impl RecordingListener {
    pub fn success_ids(&self) -> Vec<String> {
        self.successes
            .lock()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }

    pub fn failure_messages(&self) -> Vec<String> {
        self.failures
            .lock()
            .iter()
            .map(|(_, failure)| failure.to_string())
            .collect()
    }

    pub fn total_callbacks(&self) -> usize {
        self.successes.lock().len() + self.failures.lock().len()
    }
}

impl JobListener for RecordingListener {
    fn on_terminal_success(&self, job_id: &AnalysisJobId, result: SimilarityMatrix) {
        self.successes.lock().push((job_id.clone(), result));
    }

    fn on_terminal_failure(&self, job_id: &AnalysisJobId, failure: JobFailure) {
        self.failures.lock().push((job_id.clone(), failure));
    }
}

pub fn job(id: &str) -> AnalysisJobId {
    AnalysisJobId::new(id).unwrap()
}

pub fn sample_matrix() -> SimilarityMatrix {
    SimilarityMatrix::from_pairs(3, &[((0, 1), 0.9), ((1, 2), 0.4)]).unwrap()
}
