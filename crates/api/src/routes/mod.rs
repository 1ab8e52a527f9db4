pub mod health;
pub mod jobs;
pub mod ui;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate          submit a text-to-image (JSON) or upscale (multipart) job
/// /check-status      poll RunningHub for one job and record completion
/// /history           all jobs, newest first
/// /webhook           RunningHub completion callback
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
