//! Handler for the job history listing.

use axum::extract::State;
use axum::Json;
use imagegen_core::history::sort_newest_first;
use imagegen_core::job::JobRecord;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/history
///
/// Every stored job, newest first. An empty store yields `[]`.
pub async fn list_history(State(state): State<AppState>) -> AppResult<Json<Vec<JobRecord>>> {
    let mut records = state.store.list_all().await?;
    sort_newest_first(&mut records);
    Ok(Json(records))
}
