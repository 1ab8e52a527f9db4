//! RunningHub response envelopes and webhook payloads.
//!
//! Every RunningHub endpoint answers with `{"code": 0, "msg": "...",
//! "data": ...}`, where a non-zero `code` is a rejection. The shape of
//! `data` varies by endpoint and, for task outputs, by task state, so
//! result payloads are kept as raw JSON and inspected leniently.

use serde::{Deserialize, Deserializer};

/// Generic `{code, msg, data, error}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Optional structured error attached to rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub details: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Best human-readable reason for a rejection.
    pub fn rejection_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.details.clone())
            .filter(|d| !d.is_empty())
            .or_else(|| self.msg.clone().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| "Unknown error from RunningHub".to_string())
    }
}

/// `data` of a successful upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    pub file_name: String,
}

/// `data` of a successful task creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskData {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
}

/// Accept ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string_or_number(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected string or number, got null"))
}

/// Optional id sent as a JSON string, number, or `null`.
///
/// Use with `#[serde(default)]` so an absent field is `None` too.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// A task's result as reported by the outputs endpoint or a webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResult {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TaskResult {
    /// URL of the first output file, if the task succeeded with output.
    pub fn first_file_url(&self) -> Option<&str> {
        if self.code != 0 {
            return None;
        }
        self.data
            .as_array()?
            .first()?
            .get("fileUrl")?
            .as_str()
            .filter(|url| !url.is_empty())
    }

    /// The engine's status message, empty when absent.
    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or_default()
    }
}

/// Errors decoding a webhook delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid webhook body: {0}")]
    Body(#[source] serde_json::Error),

    #[error("Invalid webhook eventData: {0}")]
    EventData(#[source] serde_json::Error),
}

/// Body RunningHub posts to the webhook when a task finishes.
///
/// `eventData` arrives as a JSON-encoded string; an already-decoded
/// object is accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub event_data: Option<serde_json::Value>,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(WebhookError::Body)
    }

    /// Decode the embedded task result. `None` when the payload has none.
    pub fn task_result(&self) -> Result<Option<TaskResult>, WebhookError> {
        let result = match &self.event_data {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::String(raw)) => serde_json::from_str(raw),
            Some(value) => serde_json::from_value(value.clone()),
        };
        result.map(Some).map_err(WebhookError::EventData)
    }

    /// `(task_id, image_url)` when the delivery reports a finished task
    /// with output; `None` for every other well-formed delivery.
    pub fn completion(&self) -> Result<Option<(String, String)>, WebhookError> {
        let Some(task_id) = self.task_id.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(result) = self.task_result()? else {
            return Ok(None);
        };
        Ok(result
            .first_file_url()
            .map(|url| (task_id.to_string(), url.to_string())))
    }
}
