//! RunningHub workflow-engine client.
//!
//! Wraps the engine's HTTP API (asset upload, task creation, task output
//! retrieval) and parses the completion payload it pushes to webhooks.

pub mod api;
pub mod messages;

pub use api::{RunningHubApi, RunningHubEndpoints, RunningHubError, UploadFile};
pub use messages::{TaskResult, WebhookError, WebhookPayload};
