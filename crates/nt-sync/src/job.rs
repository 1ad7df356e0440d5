use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::coordinator::SyncSummary;

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Started,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    pub ts: DateTime<Utc>,
    pub level: MessageLevel,
    pub text: String,
}

/// Durable record of one sync run, polled by the client UI.
///
/// Written by a single coordinator, read concurrently by pollers. The
/// message log is append-only in processing order; `processed_items` never
/// decreases and never exceeds `total_items`; terminal statuses are final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_items: usize,
    pub processed_items: usize,
    pub messages: Vec<JobMessage>,
    pub result: Option<SyncSummary>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// JobStore
// ---------------------------------------------------------------------------

/// In-memory job store shared between the sync worker and the HTTP pollers.
///
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh job in `Started` state and return its id.
    pub async fn create_job(&self, total_items: usize) -> Uuid {
        let job_id = Uuid::new_v4();
        let job = Job {
            job_id,
            status: JobStatus::Started,
            total_items,
            processed_items: 0,
            messages: Vec::new(),
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.jobs.write().await.insert(job_id, job);
        job_id
    }

    /// Append progress: bump `processed_items` by `delta` (clamped to the
    /// total) and push a log line. Flips `Started` into `Running`.
    /// Ignored with a warning on unknown or already-terminal jobs.
    pub async fn append_progress(
        &self,
        job_id: Uuid,
        delta: usize,
        level: MessageLevel,
        text: impl Into<String>,
    ) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            warn!(%job_id, "progress for unknown job dropped");
            return;
        };
        if job.status.is_terminal() {
            warn!(%job_id, "progress for terminal job dropped");
            return;
        }
        job.status = JobStatus::Running;
        job.processed_items = (job.processed_items + delta).min(job.total_items);
        job.messages.push(JobMessage {
            ts: Utc::now(),
            level,
            text: text.into(),
        });
    }

    /// Mark a job completed with its summary. No-op on terminal jobs.
    pub async fn complete(&self, job_id: Uuid, result: SyncSummary) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            return;
        };
        if job.status.is_terminal() {
            warn!(%job_id, "complete() on terminal job ignored");
            return;
        }
        job.status = JobStatus::Completed;
        job.result = Some(result);
        job.finished_at = Some(Utc::now());
    }

    /// Mark a job failed. No-op on terminal jobs.
    pub async fn fail(&self, job_id: Uuid, error: impl Into<String>) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            return;
        };
        if job.status.is_terminal() {
            warn!(%job_id, "fail() on terminal job ignored");
            return;
        }
        job.status = JobStatus::Failed;
        job.error = Some(error.into());
        job.finished_at = Some(Utc::now());
    }

    /// Snapshot of one job for a polling reader.
    pub async fn get_job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_summary() -> SyncSummary {
        SyncSummary::default()
    }

    #[tokio::test]
    async fn create_starts_in_started_state() {
        let store = JobStore::new();
        let id = store.create_job(6).await;

        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Started);
        assert_eq!(job.total_items, 6);
        assert_eq!(job.processed_items, 0);
        assert!(job.messages.is_empty());
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_clamped() {
        let store = JobStore::new();
        let id = store.create_job(2).await;

        store
            .append_progress(id, 1, MessageLevel::Info, "one")
            .await;
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.processed_items, 1);

        // Over-reporting clamps at the total instead of overflowing it.
        store
            .append_progress(id, 5, MessageLevel::Info, "too many")
            .await;
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.processed_items, 2);
        assert_eq!(job.messages.len(), 2);
        assert_eq!(job.messages[0].text, "one");
    }

    #[tokio::test]
    async fn terminal_state_is_final() {
        let store = JobStore::new();
        let id = store.create_job(1).await;

        store.complete(id, empty_summary()).await;
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        let finished = job.finished_at.unwrap();

        // No transition out of a terminal state, no late progress.
        store.fail(id, "late failure").await;
        store
            .append_progress(id, 1, MessageLevel::Error, "late progress")
            .await;
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
        assert!(job.messages.is_empty());
        assert_eq!(job.finished_at.unwrap(), finished);
    }

    #[tokio::test]
    async fn fail_records_error_string() {
        let store = JobStore::new();
        let id = store.create_job(3).await;

        store.fail(id, "job store unreachable").await;
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("job store unreachable"));
    }

    #[tokio::test]
    async fn unknown_job_reads_as_none() {
        let store = JobStore::new();
        assert!(store.get_job(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn jobs_are_isolated_from_each_other() {
        let store = JobStore::new();
        let a = store.create_job(1).await;
        let b = store.create_job(1).await;

        store.append_progress(a, 1, MessageLevel::Info, "a").await;
        store.complete(a, empty_summary()).await;

        let job_b = store.get_job(b).await.unwrap();
        assert_eq!(job_b.status, JobStatus::Started);
        assert_eq!(job_b.processed_items, 0);
    }
}
