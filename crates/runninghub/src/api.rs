//! REST API client for the RunningHub HTTP endpoints.
//!
//! Wraps asset upload, task creation and task output retrieval using
//! [`reqwest`]. Every call authenticates with the account API key in the
//! request body, as RunningHub requires.

use std::time::Duration;

use imagegen_core::workflow::NodeInfo;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::messages::{CreateTaskData, Envelope, TaskResult, UploadData};

/// Default asset upload endpoint.
pub const DEFAULT_UPLOAD_URL: &str = "https://www.runninghub.ai/task/openapi/upload";

/// Default task creation endpoint for published AI apps.
pub const DEFAULT_RUN_URL: &str = "https://www.runninghub.ai/task/openapi/ai-app/run";

/// Default task output endpoint.
pub const DEFAULT_OUTPUTS_URL: &str = "https://www.runninghub.ai/task/openapi/outputs";

/// Endpoint URLs, overridable for staging deployments and tests.
#[derive(Debug, Clone)]
pub struct RunningHubEndpoints {
    pub upload_url: String,
    pub run_url: String,
    pub outputs_url: String,
}

impl Default for RunningHubEndpoints {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            run_url: DEFAULT_RUN_URL.to_string(),
            outputs_url: DEFAULT_OUTPUTS_URL.to_string(),
        }
    }
}

/// Errors from the RunningHub API layer.
#[derive(Debug, thiserror::Error)]
pub enum RunningHubError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// RunningHub returned a non-2xx status code.
    #[error("RunningHub API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The upload endpoint answered with a non-zero `code`.
    #[error("RunningHub Upload Error: {0}")]
    UploadRejected(String),

    /// The task endpoint answered with a non-zero `code`.
    #[error("API Error: {0}")]
    Rejected(String),

    /// A success envelope arrived without the expected `data`.
    #[error("Unexpected RunningHub response: {0}")]
    MalformedResponse(&'static str),
}

/// An input image to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    webapp_id: &'a str,
    api_key: &'a str,
    node_info_list: &'a [NodeInfo],
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputsRequest<'a> {
    api_key: &'a str,
    task_id: &'a str,
}

/// HTTP client for one RunningHub account.
pub struct RunningHubApi {
    client: reqwest::Client,
    api_key: String,
    endpoints: RunningHubEndpoints,
    webhook_url: Option<String>,
}

impl RunningHubApi {
    /// Create a client with its own connection pool and request timeout.
    pub fn new(
        api_key: String,
        endpoints: RunningHubEndpoints,
        timeout: Duration,
    ) -> Result<Self, RunningHubError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key, endpoints))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_key: String,
        endpoints: RunningHubEndpoints,
    ) -> Self {
        Self {
            client,
            api_key,
            endpoints,
            webhook_url: None,
        }
    }

    /// Ask RunningHub to call `url` when each created task finishes.
    pub fn with_webhook_url(mut self, url: Option<String>) -> Self {
        self.webhook_url = url.filter(|u| !u.is_empty());
        self
    }

    /// Upload an input image. Returns the engine-side file name to pass
    /// as the image node's value.
    pub async fn upload_image(&self, file: UploadFile) -> Result<String, RunningHubError> {
        let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = reqwest::multipart::Form::new()
            .text("apiKey", self.api_key.clone())
            .text("fileType", "image")
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoints.upload_url)
            .multipart(form)
            .send()
            .await?;

        let envelope: Envelope<UploadData> = Self::parse_response(response).await?;
        if !envelope.is_success() {
            return Err(RunningHubError::UploadRejected(
                envelope.msg.unwrap_or_default(),
            ));
        }
        envelope
            .data
            .map(|d| d.file_name)
            .ok_or(RunningHubError::MalformedResponse("upload response without data"))
    }

    /// Create a task for the published workflow `webapp_id`.
    ///
    /// Returns the engine-assigned task id.
    pub async fn create_task(
        &self,
        webapp_id: &str,
        node_info_list: &[NodeInfo],
    ) -> Result<String, RunningHubError> {
        let body = CreateTaskRequest {
            webapp_id,
            api_key: &self.api_key,
            node_info_list,
            webhook_url: self.webhook_url.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoints.run_url)
            .json(&body)
            .send()
            .await?;

        let envelope: Envelope<CreateTaskData> = Self::parse_response(response).await?;
        if !envelope.is_success() {
            return Err(RunningHubError::Rejected(envelope.rejection_message()));
        }
        envelope
            .data
            .map(|d| d.task_id)
            .ok_or(RunningHubError::MalformedResponse("run response without data"))
    }

    /// Query the current result of a task.
    ///
    /// A task still running is not an error: the returned [`TaskResult`]
    /// carries RunningHub's non-zero code and status message.
    pub async fn fetch_outputs(&self, task_id: &str) -> Result<TaskResult, RunningHubError> {
        let body = OutputsRequest {
            api_key: &self.api_key,
            task_id,
        };

        let response = self
            .client
            .post(&self.endpoints.outputs_url)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RunningHubError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RunningHubError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RunningHubError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RunningHubError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
