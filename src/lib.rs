//! Client for a batch email-verification service.
//!
//! An address list is uploaded, the remote job is polled until it finishes,
//! and the results are fetched once and can be exported as CSV. The
//! [`JobController`] owns that lifecycle; [`HttpJobClient`] talks to the
//! service; [`export`] encodes the results.

pub mod client;
pub mod controller;
pub mod core;
pub mod export;
pub mod presentation;

pub use crate::client::{HttpJobClient, JobService};
pub use crate::controller::{ControllerSettings, JobController, LifecycleState};
pub use crate::core::config::{Config, ConfigBuilder};
pub use crate::core::error::{AppError, JobError, Result};
pub use crate::core::models::{
    Job, JobId, JobProgress, JobStatus, ResultSet, UploadFile, VerificationOptions,
    VerificationResult,
};
pub use crate::export::{ExportArtifact, QuoteStyle};
