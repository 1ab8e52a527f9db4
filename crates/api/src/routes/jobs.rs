//! Route definitions for job submission, reconciliation, and history.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{generate, history, status, webhook};
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// POST   /generate        -> submit
/// POST   /check-status    -> check_status
/// GET    /history         -> list_history
/// POST   /webhook         -> receive_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate::submit))
        .route("/check-status", post(status::check_status))
        .route("/history", get(history::list_history))
        .route("/webhook", post(webhook::receive_webhook))
}
