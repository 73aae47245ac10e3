//! Job lifecycle controller: owns the current job, drives polling, and
//! publishes every state transition to observers.
//!
//! ```text
//! Idle ─submit─▶ Submitting ─ok─▶ Polling ─done─▶ Fetching ─ok─▶ Completed
//!                     │              │  ▲              │
//!                     │              └──┘ tick         │
//!                     └──────────────┴─────────────────┴──▶ Errored
//! ```

mod poller;
mod state;


pub use poller::PollHandle;
pub use state::LifecycleState;

use crate::client::JobService;
use crate::core::error::{AppError, JobError, Result};
use crate::core::models::{
    Job, JobId, JobProgress, JobStatus, ResultSet, UploadFile, VerificationOptions,
};
use crate::export::{export_csv_named, ExportArtifact, QuoteStyle};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Tunables for a [`JobController`].
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Fixed cadence between poll ticks, independent of poll latency.
    pub poll_interval: Duration,
    /// Consecutive transport failures tolerated while polling. `0` aborts on the first.
    pub max_consecutive_poll_failures: u32,
    pub quote_style: QuoteStyle,
    pub export_file_name: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_consecutive_poll_failures: 0,
            quote_style: QuoteStyle::Standard,
            export_file_name: crate::core::config::DEFAULT_EXPORT_FILE_NAME.to_string(),
        }
    }
}

/// What the poll loop should do after a response has been applied.
pub(crate) enum PollStep {
    Continue,
    /// The job is `done`; state is now `Fetching`.
    Done,
    /// Terminal, or the loop belongs to a superseded job.
    Finished,
}

struct Inner {
    /// Bumped on every submission and on shutdown. Work tagged with an older
    /// generation is ignored.
    generation: u64,
    poller: Option<PollHandle>,
}

/// State shared between the controller and its poll task.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    state: watch::Sender<LifecycleState>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                poller: None,
            }),
            state,
        }
    }

    fn snapshot(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub(crate) fn apply_progress(&self, generation: u64, update: JobProgress) -> PollStep {
        let inner = self.inner.lock();
        if inner.generation != generation {
            return PollStep::Finished;
        }

        let mut step = PollStep::Finished;
        self.state.send_if_modified(|state| {
            let LifecycleState::Polling { job } = state else {
                return false;
            };
            let before = job.snapshot();
            if !job.apply(update) {
                tracing::debug!(
                    target: "job_controller",
                    job_id = %job.id,
                    current = %before.status,
                    received = %update.status,
                    "Discarding stale poll response"
                );
                step = PollStep::Continue;
                return false;
            }

            let changed = before != job.snapshot();
            match job.status {
                JobStatus::Done => {
                    tracing::info!(target: "job_controller", job_id = %job.id, total = job.total, "Job done");
                    let job = job.clone();
                    *state = LifecycleState::Fetching { job };
                    step = PollStep::Done;
                    true
                }
                JobStatus::Failed => {
                    tracing::warn!(target: "job_controller", job_id = %job.id, "Service reported job failure");
                    let error = JobError::JobFailed(job.id.to_string());
                    let job = Some(job.clone());
                    *state = LifecycleState::Errored { error, job };
                    true
                }
                JobStatus::Pending | JobStatus::Running => {
                    step = PollStep::Continue;
                    changed
                }
            }
        });
        drop(inner);
        step
    }

    pub(crate) fn complete(&self, generation: u64, results: ResultSet) {
        let inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        self.state.send_if_modified(|state| {
            let LifecycleState::Fetching { job } = state else {
                return false;
            };
            let elapsed = Utc::now().signed_duration_since(job.submitted_at);
            tracing::info!(
                target: "job_controller",
                job_id = %job.id,
                count = results.len(),
                elapsed_ms = elapsed.num_milliseconds(),
                "Results stored"
            );
            let job = job.clone();
            *state = LifecycleState::Completed { job, results };
            true
        });
    }

    /// Moves an in-flight lifecycle to `Errored`. Ignored for superseded generations
    /// and for states that are already settled.
    pub(crate) fn fail(&self, generation: u64, error: JobError) {
        let inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        self.state.send_if_modified(|state| {
            if !state.is_active() {
                return false;
            }
            tracing::error!(target: "job_controller", from = state.name(), "Job lifecycle failed: {}", error);
            let job = state.job().cloned();
            *state = LifecycleState::Errored { error, job };
            true
        });
    }
}

/// Marks the submission errored if the `submit` future is dropped before the
/// service answers, so the controller never stays stuck in `Submitting`.
struct SubmitGuard<'a> {
    shared: &'a Shared,
    generation: u64,
    armed: bool,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.fail(
                self.generation,
                JobError::Transport("submission was cancelled before the service replied".into()),
            );
        }
    }
}

/// Drives one verification job at a time through its lifecycle.
pub struct JobController<S: JobService> {
    service: Arc<S>,
    shared: Arc<Shared>,
    settings: ControllerSettings,
}

impl<S: JobService> JobController<S> {
    pub fn new(service: Arc<S>, settings: ControllerSettings) -> Self {
        Self {
            service,
            shared: Arc::new(Shared::new()),
            settings,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> LifecycleState {
        self.shared.snapshot()
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.shared.state.subscribe()
    }

    /// Whether a poll task is currently alive.
    pub fn is_polling(&self) -> bool {
        self.shared
            .inner
            .lock()
            .poller
            .as_ref()
            .is_some_and(|p| !p.is_finished())
    }

    /// Submits `file` and, once the service accepts it, starts polling.
    ///
    /// Rejected with [`JobError::InvalidInput`], without touching the network,
    /// when `file` is absent or another job is still in flight. Any poll loop
    /// left over from a previous job is cancelled first.
    pub async fn submit(
        &self,
        file: Option<UploadFile>,
        options: VerificationOptions,
    ) -> std::result::Result<JobId, JobError> {
        let Some(file) = file else {
            return Err(JobError::InvalidInput("no address list selected".into()));
        };

        let generation = {
            let mut inner = self.shared.inner.lock();
            let current = self.shared.state.borrow().clone();
            if current.is_active() {
                tracing::warn!(target: "job_controller", state = current.name(), "Submission rejected: a job is already in flight");
                return Err(JobError::InvalidInput(
                    "a verification job is already in flight".into(),
                ));
            }
            if let Some(old) = inner.poller.take() {
                old.cancel();
            }
            inner.generation += 1;
            self.shared
                .state
                .send_replace(LifecycleState::Submitting { options });
            inner.generation
        };

        tracing::info!(
            target: "job_controller",
            file = %file.file_name,
            smtp = options.smtp_check,
            gravatar = options.gravatar_check,
            catch_all = options.catch_all_check,
            "Submitting verification job"
        );

        let mut guard = SubmitGuard {
            shared: &self.shared,
            generation,
            armed: true,
        };
        let submitted = self.service.submit(&file, options).await;
        guard.armed = false;

        let job_id = match submitted {
            Ok(id) => id,
            Err(err) => {
                self.shared.fail(generation, err.clone());
                return Err(err);
            }
        };

        let mut inner = self.shared.inner.lock();
        if inner.generation != generation {
            return Err(JobError::InvalidInput(
                "controller was shut down during submission".into(),
            ));
        }
        self.shared.state.send_replace(LifecycleState::Polling {
            job: Job::new(job_id.clone(), options),
        });
        inner.poller = Some(poller::spawn(
            Arc::clone(&self.service),
            Arc::clone(&self.shared),
            generation,
            job_id.clone(),
            self.settings.clone(),
        ));
        tracing::info!(target: "job_controller", job_id = %job_id, "Polling started");
        Ok(job_id)
    }

    /// Resolves at the next state in which nothing further happens on its own.
    pub async fn wait_for_settled(&self) -> LifecycleState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(LifecycleState::is_settled)
            .await
            .map(|s| (*s).clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Clears an `Errored` state so the caller can start over.
    pub fn acknowledge(&self) {
        let _inner = self.shared.inner.lock();
        self.shared.state.send_if_modified(|state| {
            if matches!(state, LifecycleState::Errored { .. }) {
                *state = LifecycleState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Results of the last completed job.
    pub fn results(&self) -> Option<ResultSet> {
        self.shared.state.borrow().results().cloned()
    }

    /// Encodes the completed result set as a CSV download.
    pub fn export(&self) -> Result<ExportArtifact> {
        let results = self.results().ok_or_else(|| {
            AppError::Job(JobError::InvalidInput(
                "no results to export yet".into(),
            ))
        })?;
        export_csv_named(
            &results,
            self.settings.quote_style,
            &self.settings.export_file_name,
        )
    }

    /// Cancels any poll task and waits for it to exit. An in-flight lifecycle
    /// returns to `Idle`.
    pub async fn shutdown(&self) {
        let poller = {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            self.shared.state.send_if_modified(|state| {
                if state.is_active() {
                    tracing::info!(target: "job_controller", from = state.name(), "Controller shut down mid-job");
                    *state = LifecycleState::Idle;
                    true
                } else {
                    false
                }
            });
            inner.poller.take()
        };
        if let Some(poller) = poller {
            poller.stop().await;
        }
    }
}

impl<S: JobService> Drop for JobController<S> {
    fn drop(&mut self) {
        if let Some(poller) = self.shared.inner.lock().poller.take() {
            poller.cancel();
        }
    }
}
