//! Typed boundary to the remote verification service.

mod http;

pub use http::HttpJobClient;

use crate::core::error::JobError;
use crate::core::models::{JobId, JobProgress, ResultSet, UploadFile, VerificationOptions};
use async_trait::async_trait;

pub type JobResult<T> = std::result::Result<T, JobError>;

/// The three remote operations the lifecycle controller depends on.
#[async_trait]
pub trait JobService: Send + Sync + 'static {
    /// Uploads an address list and starts a job on the remote side.
    ///
    /// Fails with [`JobError::Validation`] when the service rejects the file and
    /// [`JobError::Transport`] on network or HTTP failure.
    async fn submit(&self, file: &UploadFile, options: VerificationOptions) -> JobResult<JobId>;

    /// Reads the job's status. Side-effect free; safe to call repeatedly.
    ///
    /// [`JobError::NotFound`] means the job expired or was evicted and is terminal.
    async fn poll(&self, job_id: &JobId) -> JobResult<JobProgress>;

    /// Retrieves the final results. Only valid once a poll has reported `done`.
    async fn fetch_results(&self, job_id: &JobId) -> JobResult<ResultSet>;
}
