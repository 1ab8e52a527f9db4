//! The [`JobStore`] abstraction and its backends.

mod memory;
mod postgres;

use async_trait::async_trait;
use imagegen_core::job::{Completion, CompletionOutcome, JobRecord};

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

/// Errors from a job store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed a query.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record could not be encoded for storage.
    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence for job records, keyed by engine task id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new record. Returns `false` if the key already existed,
    /// in which case the stored record is left unchanged.
    async fn insert(&self, record: &JobRecord) -> StoreResult<bool>;

    /// Fetch one record.
    async fn get(&self, task_id: &str) -> StoreResult<Option<JobRecord>>;

    /// Fetch every decodable record, in no particular order.
    async fn list_all(&self) -> StoreResult<Vec<JobRecord>>;

    /// Transition a record from processing to complete.
    ///
    /// Conditional on the stored status: repeated or concurrent
    /// completions of the same task apply exactly once.
    async fn complete(
        &self,
        task_id: &str,
        completion: &Completion,
    ) -> StoreResult<CompletionOutcome>;

    /// Check the backend is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}
