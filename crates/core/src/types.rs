/// Task identifiers are opaque strings assigned by the workflow engine.
pub type TaskId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
