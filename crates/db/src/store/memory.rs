use std::collections::HashMap;

use async_trait::async_trait;
use imagegen_core::job::{Completion, CompletionOutcome, JobRecord};
use imagegen_core::types::TaskId;
use tokio::sync::RwLock;

use super::{JobStore, StoreResult};

/// In-process job store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<TaskId, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, record: &JobRecord) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.task_id) {
            return Ok(false);
        }
        records.insert(record.task_id.clone(), record.clone());
        Ok(true)
    }

    async fn get(&self, task_id: &str) -> StoreResult<Option<JobRecord>> {
        Ok(self.records.read().await.get(task_id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<JobRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn complete(
        &self,
        task_id: &str,
        completion: &Completion,
    ) -> StoreResult<CompletionOutcome> {
        let mut records = self.records.write().await;
        let outcome = match records.get_mut(task_id) {
            None => CompletionOutcome::NotFound,
            Some(record) => {
                if record.apply_completion(completion) {
                    CompletionOutcome::Completed
                } else {
                    CompletionOutcome::AlreadyComplete
                }
            }
        };
        Ok(outcome)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
