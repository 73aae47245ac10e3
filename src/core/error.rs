//! Defines the custom error types for the email-verifier client.

use std::io;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// Failure conditions of a verification job, as seen by the lifecycle controller.
///
/// Cloneable so that the last error can be held inside the lifecycle state and
/// handed to every observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Rejected locally (no file, or a job is already in flight). Never reaches the network.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network or HTTP-layer failure on any remote call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service refused the submitted address list.
    #[error("Submission rejected by service: {0}")]
    Validation(String),

    /// The service no longer knows the job id. Terminal, never retried.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Results were requested before the job reached `done`.
    #[error("Results not ready for job {0}")]
    NotReady(String),

    /// The service reported `status == "failed"`.
    #[error("Verification job {0} failed")]
    JobFailed(String),
}

impl JobError {
    /// Whether a polling loop may keep going after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, JobError::Transport(_))
    }
}

impl From<reqwest::Error> for JobError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            JobError::Transport(format!("malformed response body: {}", err))
        } else {
            JobError::Transport(err.to_string())
        }
    }
}

/// The primary error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., the HTTP client).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization or deserialization.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error parsing the TOML configuration file.
    #[error("TOML Error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error parsing a URL.
    #[error("URL Parsing Error: {0}")]
    UrlParse(#[from] UrlParseError),

    /// Error building or sending HTTP requests via reqwest.
    #[error("HTTP Request Error: {0}")]
    Request(#[from] reqwest::Error),

    /// Error writing the CSV export.
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    /// A job lifecycle failure.
    #[error(transparent)]
    Job(#[from] JobError),

    /// An underlying error that doesn't fit other categories, using anyhow.
    #[error("{0:#}")]
    Generic(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(JobError::Transport("reset".into()).is_transient());
        assert!(!JobError::NotFound("j1".into()).is_transient());
        assert!(!JobError::Validation("bad csv".into()).is_transient());
        assert!(!JobError::JobFailed("j1".into()).is_transient());
    }

    #[test]
    fn job_error_passes_through_app_error_display() {
        let err: AppError = JobError::NotFound("abc".into()).into();
        assert_eq!(err.to_string(), "Job not found: abc");
    }

    #[test]
    fn generic_error_shows_context_chain() {
        use anyhow::Context;
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: AppError = Err::<(), _>(io)
            .context("Cannot read address list 'emails.csv'")
            .unwrap_err()
            .into();
        assert_eq!(
            err.to_string(),
            "Cannot read address list 'emails.csv': no such file"
        );
    }
}
