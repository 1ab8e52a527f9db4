//! Handler for RunningHub completion callbacks.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::Json;
use imagegen_runninghub::WebhookPayload;
use serde::Serialize;

use crate::reconcile::{apply_completion, CompletionSource};
use crate::state::AppState;

/// Acknowledgement returned to RunningHub.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/webhook
///
/// Always answers 200 with `success: true`, even when the delivery cannot
/// be processed, so RunningHub does not retry it. Failures are logged and
/// echoed in `error`.
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<WebhookAck> {
    let error = match handle_delivery(&state, body).await {
        Ok(()) => None,
        Err(message) => {
            tracing::error!(error = %message, "Webhook processing failed");
            Some(message)
        }
    };
    Json(WebhookAck {
        success: true,
        error,
    })
}

async fn handle_delivery(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<(), String> {
    let body = body.map_err(|e| e.body_text())?;
    let payload = WebhookPayload::parse(&body).map_err(|e| e.to_string())?;

    let Some((task_id, image_url)) = payload.completion().map_err(|e| e.to_string())? else {
        tracing::debug!(task_id = ?payload.task_id, "Webhook without result ignored");
        return Ok(());
    };

    apply_completion(
        state.store.as_ref(),
        &task_id,
        &image_url,
        CompletionSource::Webhook,
    )
    .await
    .map_err(|e| e.to_string())?;
    Ok(())
}
