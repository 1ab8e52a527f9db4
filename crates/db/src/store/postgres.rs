use async_trait::async_trait;
use chrono::SecondsFormat;
use imagegen_core::job::{Completion, CompletionOutcome, JobRecord};

use super::{JobStore, StoreResult};
use crate::repositories::JobRecordRepo;
use crate::DbPool;

/// PostgreSQL-backed job store over the `job_records` table.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Decode a stored document, logging and discarding anything malformed.
fn decode(task_id: &str, value: serde_json::Value) -> Option<JobRecord> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(task_id, error = %e, "Skipping undecodable job record");
            None
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, record: &JobRecord) -> StoreResult<bool> {
        let value = serde_json::to_value(record)?;
        Ok(JobRecordRepo::insert(&self.pool, &record.task_id, &value).await?)
    }

    async fn get(&self, task_id: &str) -> StoreResult<Option<JobRecord>> {
        let value = JobRecordRepo::find(&self.pool, task_id).await?;
        Ok(value.and_then(|v| decode(task_id, v)))
    }

    async fn list_all(&self) -> StoreResult<Vec<JobRecord>> {
        let rows = JobRecordRepo::list_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(task_id, value)| decode(&task_id, value))
            .collect())
    }

    async fn complete(
        &self,
        task_id: &str,
        completion: &Completion,
    ) -> StoreResult<CompletionOutcome> {
        let completed_at = completion
            .completed_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let transitioned = JobRecordRepo::mark_complete(
            &self.pool,
            task_id,
            &completion.image_url,
            &completed_at,
        )
        .await?;

        if transitioned {
            return Ok(CompletionOutcome::Completed);
        }
        if JobRecordRepo::exists(&self.pool, task_id).await? {
            Ok(CompletionOutcome::AlreadyComplete)
        } else {
            Ok(CompletionOutcome::NotFound)
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
