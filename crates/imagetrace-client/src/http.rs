use async_trait::async_trait;
use imagetrace_core::{AnalysisJobId, BackendConfig, HashType};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::BackendClient;
use crate::error::ClientError;
use crate::wire::{HealthResponse, JobStatusResponse, SubmitResponse};

/// `BackendClient` over HTTP against the FastAPI analysis service
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    base_url: Url,
    client: Client,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }
        // Relative segments are appended, so the base path must end in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                url,
                body,
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(format!("{}: {}", url, e)))
    }

    /// Completed status payloads omit the matrix; it lives under
    /// `/analysis/results/{id}` as `results.similarity_matrix`.
    async fn fetch_result(&self, job_id: &AnalysisJobId) -> Result<Value, ClientError> {
        let url = self.endpoint(&["analysis", "results", job_id.as_str()])?;
        debug!(target: "imagetrace::client", job_id = %job_id, "Fetching analysis result");
        let mut body: Value = Self::read_json(self.client.get(url).send().await?).await?;
        body.get_mut("results")
            .map(Value::take)
            .filter(|results| !results.is_null())
            .ok_or_else(|| {
                ClientError::InvalidPayload(format!("analysis {} has no results", job_id))
            })
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn check_health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.endpoint(&["health", ""])?;
        let response = self.client.get(url).send().await?;
        Self::read_json(response).await
    }

    async fn submit_analysis(
        &self,
        project_id: &str,
        hash_type: HashType,
    ) -> Result<SubmitResponse, ClientError> {
        let url = self.endpoint(&["analysis", "start"])?;
        debug!(
            target: "imagetrace::client",
            project_id,
            hash_type = %hash_type,
            "Submitting analysis"
        );
        let response = self
            .client
            .post(url)
            .query(&[("project_id", project_id), ("hash_type", hash_type.as_str())])
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn get_job_status(
        &self,
        job_id: &AnalysisJobId,
    ) -> Result<JobStatusResponse, ClientError> {
        let url = self.endpoint(&["analysis", "status", job_id.as_str()])?;
        let mut status: JobStatusResponse =
            Self::read_json(self.client.get(url).send().await?).await?;

        if status.is_completed() && status.result.is_none() {
            status.result = Some(self.fetch_result(job_id).await?);
        }
        Ok(status)
    }
}
