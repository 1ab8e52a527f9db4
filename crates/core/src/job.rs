//! Job records and their two-state lifecycle.
//!
//! A record is created once in [`JobStatus::Processing`] and moves at most
//! once to [`JobStatus::Complete`]. After that nothing on it changes.

use serde::{Deserialize, Serialize};

use crate::types::{TaskId, Timestamp};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Complete,
}

impl JobStatus {
    /// Wire representation, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
        }
    }
}

/// Which workflow a job was submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobKind {
    TextToImage,
    Upscale,
}

/// Request-specific fields carried unchanged from submission to display.
///
/// Every field is optional so records written by either workflow (or by
/// older deployments) decode into the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<JobKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_strength: Option<String>,
}

/// One stored job, keyed by `task_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub task_id: TaskId,
    pub status: JobStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub details: JobDetails,
}

/// The result of a finished job, as reported by the workflow engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub image_url: String,
    pub completed_at: Timestamp,
}

/// What applying a [`Completion`] to the store did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The record moved from processing to complete.
    Completed,
    /// The record was already complete; nothing changed.
    AlreadyComplete,
    /// No record exists under that task id; nothing changed.
    NotFound,
}

impl JobRecord {
    /// Build the initial record for a freshly accepted submission.
    pub fn processing(task_id: impl Into<TaskId>, details: JobDetails, now: Timestamp) -> Self {
        Self {
            task_id: task_id.into(),
            status: JobStatus::Processing,
            created_at: now,
            completed_at: None,
            image_url: None,
            details,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }

    /// Apply a completion if the record is still processing.
    ///
    /// Returns `false` (and leaves the record untouched) when it was
    /// already complete.
    pub fn apply_completion(&mut self, completion: &Completion) -> bool {
        if self.is_complete() {
            return false;
        }
        self.status = JobStatus::Complete;
        self.image_url = Some(completion.image_url.clone());
        self.completed_at = Some(completion.completed_at);
        true
    }
}
