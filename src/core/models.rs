//! Data types shared by the job client, the lifecycle controller and the exporter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Which checks the remote service should run for every address.
///
/// Copied into the job at submission time; later changes to the caller's
/// copy never reach an in-flight job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOptions {
    pub smtp_check: bool,
    pub gravatar_check: bool,
    pub catch_all_check: bool,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            smtp_check: true,
            gravatar_check: false,
            catch_all_check: true,
        }
    }
}

/// Opaque, server-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote job status. Ordered: a job only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    /// Position in `pending -> running -> {done | failed}`. Both terminal states share a rank.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Done | JobStatus::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// True when moving from `self` to `next` would go backwards (or sideways between
    /// the two terminal states).
    pub fn is_regression_to(self, next: JobStatus) -> bool {
        next.rank() < self.rank() || (self.is_terminal() && self != next)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u64,
    #[serde(default)]
    pub total: u64,
}

impl JobProgress {
    pub fn new(status: JobStatus, progress: u64, total: u64) -> Self {
        Self {
            status,
            progress,
            total,
        }
    }
}

/// The job currently tracked by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u64,
    pub total: u64,
    pub options: VerificationOptions,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, options: VerificationOptions) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            total: 0,
            options,
            submitted_at: Utc::now(),
        }
    }

    /// Applies a poll response unless it is stale.
    ///
    /// Returns `false` (leaving the job untouched) when the response would move the
    /// status backwards, or would lower `progress` without changing the status.
    /// A total of `0` means "not reported" and never replaces a known total.
    pub fn apply(&mut self, update: JobProgress) -> bool {
        if self.status.is_regression_to(update.status) {
            return false;
        }
        let same_phase = update.status == self.status && !self.status.is_terminal();
        if same_phase && update.progress < self.progress {
            return false;
        }

        let total = if update.total > 0 {
            update.total
        } else {
            self.total
        };
        let progress = if total > 0 {
            update.progress.min(total)
        } else {
            update.progress
        };
        self.status = update.status;
        self.progress = progress;
        self.total = total;
        true
    }

    pub fn snapshot(&self) -> JobProgress {
        JobProgress::new(self.status, self.progress, self.total)
    }
}

/// Outcome for one address.
///
/// `reachable` is `None` only when the service could not reach a conclusion, in which
/// case `error` normally carries the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub email: String,
    #[serde(default, deserialize_with = "deserialize_reachable")]
    pub reachable: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_error")]
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn reachable(email: impl Into<String>, reachable: bool) -> Self {
        Self {
            email: email.into(),
            reachable: Some(reachable),
            error: None,
        }
    }

    pub fn errored(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            reachable: None,
            error: Some(error.into()),
        }
    }
}

/// Accepts a JSON boolean, `null`, or the textual verdicts some service builds emit.
fn deserialize_reachable<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<Wire>::deserialize(deserializer)? {
        None => None,
        Some(Wire::Flag(flag)) => Some(flag),
        Some(Wire::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
    })
}

fn deserialize_error<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Results in the order the service returned them. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet(Arc<[VerificationResult]>);

impl ResultSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VerificationResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[VerificationResult] {
        &self.0
    }
}

impl From<Vec<VerificationResult>> for ResultSet {
    fn from(results: Vec<VerificationResult>) -> Self {
        Self(results.into())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a VerificationResult;
    type IntoIter = std::slice::Iter<'a, VerificationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The address list to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads the whole file; the service does its own parsing.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "emails.csv".to_string());
        Ok(Self { file_name, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_form_defaults() {
        let opts = VerificationOptions::default();
        assert!(opts.smtp_check);
        assert!(!opts.gravatar_check);
        assert!(opts.catch_all_check);
    }

    #[test]
    fn status_regressions() {
        use JobStatus::*;
        assert!(Running.is_regression_to(Pending));
        assert!(Done.is_regression_to(Running));
        assert!(Done.is_regression_to(Failed));
        assert!(!Pending.is_regression_to(Running));
        assert!(!Running.is_regression_to(Running));
        assert!(!Running.is_regression_to(Failed));
        assert!(!Done.is_regression_to(Done));
    }

    #[test]
    fn job_discards_stale_updates() {
        let mut job = Job::new(JobId::new("j1"), VerificationOptions::default());
        assert!(job.apply(JobProgress::new(JobStatus::Running, 5, 10)));
        assert!(!job.apply(JobProgress::new(JobStatus::Pending, 0, 10)));
        assert_eq!(job.snapshot(), JobProgress::new(JobStatus::Running, 5, 10));

        assert!(!job.apply(JobProgress::new(JobStatus::Running, 3, 10)));
        assert_eq!(job.progress, 5);
    }

    #[test]
    fn job_clamps_progress_to_total() {
        let mut job = Job::new(JobId::new("j1"), VerificationOptions::default());
        assert!(job.apply(JobProgress::new(JobStatus::Running, 12, 10)));
        assert_eq!(job.progress, 10);
        assert_eq!(job.total, 10);
    }

    #[test]
    fn job_keeps_known_total_when_update_omits_it() {
        let mut job = Job::new(JobId::new("j1"), VerificationOptions::default());
        assert!(job.apply(JobProgress::new(JobStatus::Running, 5, 10)));
        assert!(job.apply(JobProgress::new(JobStatus::Running, 6, 0)));
        assert_eq!(job.snapshot(), JobProgress::new(JobStatus::Running, 6, 10));

        assert!(job.apply(JobProgress::new(JobStatus::Running, 14, 0)));
        assert_eq!(job.progress, 10);
        assert!(job.progress <= job.total);
    }

    #[test]
    fn reachable_accepts_bool_null_and_text() {
        let parsed: Vec<VerificationResult> = serde_json::from_str(
            r#"[
                {"email": "a@x.com", "reachable": true},
                {"email": "b@x.com", "reachable": null, "error": "timeout"},
                {"email": "c@x.com", "reachable": "no"},
                {"email": "d@x.com", "reachable": "unknown", "error": ""},
                {"email": "e@x.com"}
            ]"#,
        )
        .unwrap();

        assert_eq!(parsed[0], VerificationResult::reachable("a@x.com", true));
        assert_eq!(parsed[1], VerificationResult::errored("b@x.com", "timeout"));
        assert_eq!(parsed[2].reachable, Some(false));
        assert_eq!(parsed[3].reachable, None);
        assert_eq!(parsed[3].error, None);
        assert_eq!(parsed[4].reachable, None);
    }

    #[test]
    fn progress_decodes_lowercase_status() {
        let p: JobProgress =
            serde_json::from_str(r#"{"status":"running","progress":2,"total":5}"#).unwrap();
        assert_eq!(p, JobProgress::new(JobStatus::Running, 2, 5));
    }
}
