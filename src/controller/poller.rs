//! The scheduled polling task and its cancellation handle.

use super::{ControllerSettings, PollStep, Shared};
use crate::client::JobService;
use crate::core::models::JobId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to a running poll task. Cancelling is honoured even while a poll
/// or the final fetch is outstanding: the in-flight request is dropped and
/// its response never applied.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the task and waits until it has exited.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!(target: "job_controller", "Poll task panicked: {}", e);
            }
        }
    }
}

/// Starts polling `job_id` on `settings.poll_interval`, then fetches results once
/// the service reports `done`.
pub(super) fn spawn<S: JobService>(
    service: Arc<S>,
    shared: Arc<Shared>,
    generation: u64,
    job_id: JobId,
    settings: ControllerSettings,
) -> PollHandle {
    let token = CancellationToken::new();
    let child = token.clone();
    let task = tokio::spawn(async move {
        run(service, shared, generation, job_id, settings, child).await;
    });
    PollHandle { token, task }
}

async fn run<S: JobService>(
    service: Arc<S>,
    shared: Arc<Shared>,
    generation: u64,
    job_id: JobId,
    settings: ControllerSettings,
    token: CancellationToken,
) {
    let reached_done =
        poll_until_terminal(&*service, &shared, generation, &job_id, &settings, &token).await;
    if !reached_done {
        return;
    }

    tracing::debug!(target: "job_controller", job_id = %job_id, "Fetching results");
    let fetched = tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!(target: "job_controller", job_id = %job_id, "Fetch abandoned on cancellation");
            return;
        }
        res = service.fetch_results(&job_id) => res,
    };

    match fetched {
        Ok(results) => shared.complete(generation, results),
        Err(err) => shared.fail(generation, err),
    }
}

/// Returns `true` once the job is `done` and the state has moved to `Fetching`.
/// The ticker is dropped on return, so no further ticks follow.
async fn poll_until_terminal<S: JobService>(
    service: &S,
    shared: &Shared,
    generation: u64,
    job_id: &JobId,
    settings: &ControllerSettings,
    token: &CancellationToken,
) -> bool {
    let period = settings.poll_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(target: "job_controller", job_id = %job_id, "Polling cancelled");
                return false;
            }
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(target: "job_controller", job_id = %job_id, "Polling cancelled mid-request");
                return false;
            }
            res = service.poll(job_id) => res,
        };
        // The next tick is a full period after this response, however slow it was.
        ticker.reset();

        match outcome {
            Ok(update) => {
                consecutive_failures = 0;
                match shared.apply_progress(generation, update) {
                    PollStep::Continue => {}
                    PollStep::Done => return true,
                    PollStep::Finished => return false,
                }
            }
            Err(err)
                if err.is_transient()
                    && consecutive_failures < settings.max_consecutive_poll_failures =>
            {
                consecutive_failures += 1;
                tracing::warn!(
                    target: "job_controller",
                    job_id = %job_id,
                    attempt = consecutive_failures,
                    limit = settings.max_consecutive_poll_failures,
                    "Poll failed, will retry on next tick: {}", err
                );
            }
            Err(err) => {
                shared.fail(generation, err);
                return false;
            }
        }
    }
}
