//! reqwest-backed implementation of [`JobService`].

use super::{JobResult, JobService};
use crate::core::config::Config;
use crate::core::error::{AppError, JobError, Result};
use crate::core::models::{
    JobId, JobProgress, JobStatus, ResultSet, UploadFile, VerificationOptions, VerificationResult,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

const UPLOAD_PATH: &str = "api/upload";
const PROGRESS_PATH: &str = "api/progress";
const RESULTS_PATH: &str = "api/results";

#[derive(Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// Body of the results endpoint. The service returns the whole job document;
/// only these two fields matter here.
#[derive(Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default)]
    results: Option<Vec<VerificationResult>>,
}

/// HTTP client for the verification service's upload/progress/results endpoints.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    client: Client,
    base_url: Url,
}

impl HttpJobClient {
    /// Builds a client from the runtime configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config.server_url.clone()))
    }

    /// Wraps an existing reqwest client. `base_url` should end with `/`.
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> JobResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| JobError::Transport(format!("Invalid endpoint '{}': {}", path, e)))
    }

    fn job_endpoint(&self, path: &str, job_id: &JobId) -> JobResult<Url> {
        let mut url = self.endpoint(path)?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                JobError::Transport(format!("Base URL '{}' cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty().push(job_id.as_str());
        }
        Ok(url)
    }
}

/// Maps non-success statuses onto the job error taxonomy.
async fn error_for_status(response: Response, job_id: Option<&JobId>) -> JobResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    Err(match (status, job_id) {
        (StatusCode::NOT_FOUND, Some(id)) => JobError::NotFound(id.to_string()),
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, None) => {
            JobError::Validation(if body.is_empty() { detail } else { body.to_string() })
        }
        _ => JobError::Transport(format!("HTTP {}", detail)),
    })
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[async_trait]
impl JobService for HttpJobClient {
    async fn submit(&self, file: &UploadFile, options: VerificationOptions) -> JobResult<JobId> {
        let url = self.endpoint(UPLOAD_PATH)?;
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str("text/csv")?;
        let form = Form::new()
            .part("file", part)
            .text("smtp_check", flag(options.smtp_check))
            .text("gravatar_check", flag(options.gravatar_check))
            .text("catch_all_check", flag(options.catch_all_check));

        tracing::debug!(
            target: "job_client",
            file = %file.file_name,
            bytes = file.bytes.len(),
            ?options,
            "Submitting address list to {}", url
        );

        let response = self.client.post(url).multipart(form).send().await?;
        let response = error_for_status(response, None).await?;
        let body: SubmitResponse = response.json().await?;

        if body.job_id.trim().is_empty() {
            return Err(JobError::Transport(
                "Service returned an empty job id".to_string(),
            ));
        }
        let job_id = JobId::new(body.job_id);
        tracing::info!(target: "job_client", job_id = %job_id, "Job accepted");
        Ok(job_id)
    }

    async fn poll(&self, job_id: &JobId) -> JobResult<JobProgress> {
        let url = self.job_endpoint(PROGRESS_PATH, job_id)?;
        let response = self.client.get(url).send().await?;
        let response = error_for_status(response, Some(job_id)).await?;
        let progress: JobProgress = response.json().await?;
        tracing::trace!(
            target: "job_client",
            job_id = %job_id,
            status = %progress.status,
            progress = progress.progress,
            total = progress.total,
            "Poll response"
        );
        Ok(progress)
    }

    async fn fetch_results(&self, job_id: &JobId) -> JobResult<ResultSet> {
        let url = self.job_endpoint(RESULTS_PATH, job_id)?;
        let response = self.client.get(url).send().await?;
        let response = error_for_status(response, Some(job_id)).await?;
        let body: ResultsResponse = response.json().await?;

        if let Some(status) = body.status {
            if status != JobStatus::Done {
                tracing::warn!(target: "job_client", job_id = %job_id, %status, "Results requested before completion");
                return Err(JobError::NotReady(job_id.to_string()));
            }
        }
        let results = body
            .results
            .ok_or_else(|| JobError::NotReady(job_id.to_string()))?;

        tracing::info!(target: "job_client", job_id = %job_id, count = results.len(), "Fetched results");
        Ok(ResultSet::from(results))
    }
}
