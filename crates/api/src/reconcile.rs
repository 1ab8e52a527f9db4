//! Job completion reconciliation.
//!
//! Three triggers can learn that a task finished: the client-driven poll
//! (`POST /api/check-status`), RunningHub's webhook, and the optional
//! background sweep. All of them funnel into [`apply_completion`], which
//! relies on the store's conditional update so whichever trigger lands
//! first wins and the rest are no-ops.

use chrono::Utc;
use imagegen_core::job::{Completion, CompletionOutcome};
use imagegen_db::{JobStore, StoreResult};
use imagegen_runninghub::TaskResult;

use crate::error::AppResult;
use crate::state::AppState;

/// Which trigger reported a completion. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Poll,
    Webhook,
    Sweep,
}

impl CompletionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionSource::Poll => "poll",
            CompletionSource::Webhook => "webhook",
            CompletionSource::Sweep => "sweep",
        }
    }
}

/// Record that `task_id` produced `image_url`.
pub async fn apply_completion(
    store: &dyn JobStore,
    task_id: &str,
    image_url: &str,
    source: CompletionSource,
) -> StoreResult<CompletionOutcome> {
    let completion = Completion {
        image_url: image_url.to_string(),
        completed_at: Utc::now(),
    };
    let outcome = store.complete(task_id, &completion).await?;

    match outcome {
        CompletionOutcome::Completed => {
            tracing::info!(task_id, source = source.as_str(), "Job completed");
        }
        CompletionOutcome::AlreadyComplete => {
            tracing::debug!(task_id, source = source.as_str(), "Job already complete");
        }
        CompletionOutcome::NotFound => {
            tracing::warn!(task_id, source = source.as_str(), "Completion for unknown job ignored");
        }
    }
    Ok(outcome)
}

/// Ask RunningHub for the task's result and record it if it finished.
///
/// Returns the engine's answer either way so callers can relay its status.
pub async fn poll_task(
    state: &AppState,
    task_id: &str,
    source: CompletionSource,
) -> AppResult<TaskResult> {
    let result = state.runninghub.fetch_outputs(task_id).await?;

    if let Some(image_url) = result.first_file_url() {
        apply_completion(state.store.as_ref(), task_id, image_url, source).await?;
    } else {
        tracing::debug!(task_id, code = result.code, status = result.message(), "Job not finished");
    }
    Ok(result)
}
