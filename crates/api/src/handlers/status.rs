//! Handler for client-driven completion polling.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use imagegen_runninghub::messages::opt_string_or_number;
use serde::{Deserialize, Serialize};

use super::parse_json;
use crate::error::{AppError, AppResult};
use crate::reconcile::{poll_task, CompletionSource};
use crate::state::AppState;

/// Request body for `POST /api/check-status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusRequest {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub task_id: Option<String>,
}

/// Response body for `POST /api/check-status`.
#[derive(Debug, Serialize)]
pub struct CheckStatusResponse {
    pub success: bool,
    /// RunningHub's status message for the task.
    pub status: String,
}

/// POST /api/check-status
///
/// Re-query RunningHub for one task and record its result if it has
/// finished. The engine's status message is relayed as `status`.
pub async fn check_status(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<CheckStatusResponse>> {
    let input: CheckStatusRequest = parse_json(&body)?;
    let task_id = input
        .task_id
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Task ID is required".into()))?;

    let result = poll_task(&state, &task_id, CompletionSource::Poll).await?;

    Ok(Json(CheckStatusResponse {
        success: true,
        status: result.message().to_string(),
    }))
}
