//! Repository for the `job_records` key-value table.
//!
//! Records are stored as opaque JSONB documents; decoding into
//! [`imagegen_core::job::JobRecord`] happens in the store layer so a
//! malformed row never fails a whole listing.

use sqlx::PgPool;

/// Provides key-value access to job records.
pub struct JobRecordRepo;

impl JobRecordRepo {
    /// Insert a record under `task_id`.
    ///
    /// Returns `false` without touching the existing row when the key is
    /// already present.
    pub async fn insert(
        pool: &PgPool,
        task_id: &str,
        record: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO job_records (task_id, record) VALUES ($1, $2) \
             ON CONFLICT (task_id) DO NOTHING",
        )
        .bind(task_id)
        .bind(record)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Fetch the raw document stored under `task_id`.
    pub async fn find(
        pool: &PgPool,
        task_id: &str,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT record FROM job_records WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }

    /// Fetch every stored `(task_id, record)` pair, in no particular order.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<(String, serde_json::Value)>, sqlx::Error> {
        sqlx::query_as::<_, (String, serde_json::Value)>(
            "SELECT task_id, record FROM job_records",
        )
        .fetch_all(pool)
        .await
    }

    /// Mark a record complete if, and only if, it is still processing.
    ///
    /// The status check and the write happen in one statement, so a
    /// webhook and a poll racing on the same key complete it once.
    /// Returns `true` when a row transitioned.
    pub async fn mark_complete(
        pool: &PgPool,
        task_id: &str,
        image_url: &str,
        completed_at: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_records \
             SET record = record || jsonb_build_object( \
                     'status', 'complete', \
                     'imageUrl', $2::text, \
                     'completedAt', $3::text), \
                 updated_at = NOW() \
             WHERE task_id = $1 AND record->>'status' = 'processing'",
        )
        .bind(task_id)
        .bind(image_url)
        .bind(completed_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Whether any record exists under `task_id`.
    pub async fn exists(pool: &PgPool, task_id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM job_records WHERE task_id = $1)")
            .bind(task_id)
            .fetch_one(pool)
            .await
    }
}
