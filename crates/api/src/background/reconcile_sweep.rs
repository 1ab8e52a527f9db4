//! Periodic reconciliation of jobs still marked `processing`.
//!
//! Covers jobs whose webhook never arrived and whose browser tab was
//! closed before the client poll saw them finish. Each tick lists the
//! store, then polls RunningHub for every outstanding task one at a time.

use std::time::Duration;

use imagegen_core::history::outstanding_task_ids;
use tokio_util::sync::CancellationToken;

use crate::reconcile::{poll_task, CompletionSource};
use crate::state::AppState;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(state: AppState, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Reconcile sweep started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconcile sweep stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_once(&state, &cancel).await;
            }
        }
    }
}

/// Poll every outstanding task once. Failures are logged and skipped.
pub async fn sweep_once(state: &AppState, cancel: &CancellationToken) {
    let records = match state.store.list_all().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, "Reconcile sweep: listing jobs failed");
            return;
        }
    };

    let outstanding = outstanding_task_ids(&records);
    if outstanding.is_empty() {
        tracing::debug!("Reconcile sweep: nothing outstanding");
        return;
    }
    tracing::debug!(count = outstanding.len(), "Reconcile sweep: polling outstanding jobs");

    for task_id in outstanding {
        if cancel.is_cancelled() {
            break;
        }
        if let Err(e) = poll_task(state, &task_id, CompletionSource::Sweep).await {
            tracing::warn!(task_id = %task_id, error = %e, "Reconcile sweep: poll failed");
        }
    }
}
