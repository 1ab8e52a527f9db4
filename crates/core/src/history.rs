//! Ordering and filtering of job history.

use crate::job::{JobRecord, JobStatus};

/// Sort records newest first by `created_at`.
///
/// Ties are broken by task id so the order is stable across reads.
pub fn sort_newest_first(records: &mut [JobRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
}

/// Task ids of every record still awaiting completion.
pub fn outstanding_task_ids(records: &[JobRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.status == JobStatus::Processing)
        .map(|r| r.task_id.clone())
        .collect()
}
