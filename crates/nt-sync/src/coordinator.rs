use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use nt_core::config::CredentialProvider;
use nt_core::types::{Lecture, User};

use crate::gateway::{Workspace, WorkspaceFactory};
use crate::job::{JobStore, MessageLevel};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::reconcile::{reconcile, Decision, SyncIntent};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one (user, lecture) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OutcomeKind {
    Created,
    SelectionUpdated,
    NumberRepaired,
    Skipped(String),
    Failed(String),
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Created => "created",
            OutcomeKind::SelectionUpdated => "selection updated",
            OutcomeKind::NumberRepaired => "number repaired",
            OutcomeKind::Skipped(_) => "skipped",
            OutcomeKind::Failed(_) => "failed",
        }
    }

    fn level(&self) -> MessageLevel {
        match self {
            OutcomeKind::Failed(_) => MessageLevel::Error,
            OutcomeKind::Skipped(_) => MessageLevel::Warn,
            _ => MessageLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub user: User,
    pub lecture_id: Uuid,
    pub title: String,
    pub kind: OutcomeKind,
}

/// Aggregate result of one sync run, stored on the finished job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub success: usize,
    pub skipped: usize,
    pub errors: usize,
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncSummary {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome.kind {
            OutcomeKind::Skipped(_) => self.skipped += 1,
            OutcomeKind::Failed(_) => self.errors += 1,
            _ => self.success += 1,
        }
        self.outcomes.push(outcome);
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Drives reconcile-then-apply across all three users' workspaces.
///
/// Every per-item failure is contained: it is recorded in the summary and
/// the run moves on, so one user's expired token or one malformed page never
/// aborts the remaining work.
pub struct SyncCoordinator {
    credentials: Arc<dyn CredentialProvider>,
    workspaces: Arc<dyn WorkspaceFactory>,
    jobs: JobStore,
    progress: ProgressBus,
    /// Pause between mutating remote calls, to stay inside rate limits.
    throttle: Duration,
}

impl SyncCoordinator {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        workspaces: Arc<dyn WorkspaceFactory>,
        jobs: JobStore,
        progress: ProgressBus,
        throttle: Duration,
    ) -> Self {
        Self {
            credentials,
            workspaces,
            jobs,
            progress,
            throttle,
        }
    }

    /// Bulk sync: ensure every lecture exists in every user's workspace.
    ///
    /// Users are processed in priority order, lectures in roster order, so
    /// two runs over the same roster issue remote calls in the same order.
    /// The job's total must be `User::ALL.len() * lectures.len()`.
    pub async fn run_bulk_sync(&self, job_id: Uuid, lectures: &[Lecture]) {
        let mut summary = SyncSummary::default();

        for user in User::ALL {
            self.sync_user_portion(job_id, user, lectures, SyncIntent::BulkSeed, &mut summary)
                .await;
        }

        info!(
            %job_id,
            success = summary.success,
            skipped = summary.skipped,
            errors = summary.errors,
            "bulk sync finished"
        );
        self.jobs.complete(job_id, summary).await;
    }

    /// Selection sync: propagate one user's toggle on one lecture to all
    /// three workspaces. Never creates records; a missing remote record is
    /// a skip pointing the caller at bulk sync.
    pub async fn run_selection_sync(
        &self,
        job_id: Uuid,
        lecture: &Lecture,
        acting_user: User,
        selected: bool,
    ) {
        let mut summary = SyncSummary::default();
        let intent = SyncIntent::Toggle {
            user: acting_user,
            selected,
        };
        let lectures = std::slice::from_ref(lecture);

        for user in User::ALL {
            self.sync_user_portion(job_id, user, lectures, intent, &mut summary)
                .await;
        }

        info!(
            %job_id,
            user = user_name(acting_user),
            lecture = %lecture.numbered_title(),
            selected,
            errors = summary.errors,
            "selection sync finished"
        );
        self.jobs.complete(job_id, summary).await;
    }

    /// Process one user's share of the run: resolve credential, open the
    /// workspace, locate the database, then reconcile-and-apply each lecture.
    ///
    /// Failures before the per-lecture loop still consume one progress unit
    /// per lecture, so `processed_items` always reaches the job total.
    async fn sync_user_portion(
        &self,
        job_id: Uuid,
        user: User,
        lectures: &[Lecture],
        intent: SyncIntent,
        summary: &mut SyncSummary,
    ) {
        let Some(credential) = self.credentials.credential(user) else {
            warn!(user = user_name(user), "no credential configured; skipping workspace");
            for lecture in lectures {
                let kind =
                    OutcomeKind::Skipped(format!("no credential for {}", user.display_name()));
                self.finish_item(job_id, user, lecture, kind, summary, lectures.len())
                    .await;
            }
            return;
        };

        let workspace = match self.workspaces.open(&credential) {
            Ok(ws) => ws,
            Err(err) => {
                error!(user = user_name(user), %err, "cannot open workspace");
                for lecture in lectures {
                    let kind = OutcomeKind::Failed(err.to_string());
                    self.finish_item(job_id, user, lecture, kind, summary, lectures.len())
                        .await;
                }
                return;
            }
        };

        let database_id = match workspace.find_lecture_database().await {
            Ok(id) => id,
            Err(err) => {
                error!(user = user_name(user), %err, "cannot resolve lecture database");
                for lecture in lectures {
                    let kind = OutcomeKind::Failed(format!("database lookup: {err}"));
                    self.finish_item(job_id, user, lecture, kind, summary, lectures.len())
                        .await;
                }
                return;
            }
        };

        for lecture in lectures {
            let kind = self
                .sync_one(workspace.as_ref(), &database_id, user, lecture, intent)
                .await;
            self.finish_item(job_id, user, lecture, kind, summary, lectures.len())
                .await;
        }
    }

    /// Reconcile one lecture against one workspace and apply the decision.
    async fn sync_one(
        &self,
        workspace: &dyn Workspace,
        database_id: &str,
        user: User,
        lecture: &Lecture,
        intent: SyncIntent,
    ) -> OutcomeKind {
        let candidates = match workspace.search_lecture(database_id, lecture).await {
            Ok(c) => c,
            Err(err) => return OutcomeKind::Failed(format!("search: {err}")),
        };

        match reconcile(lecture, &candidates, intent) {
            Decision::Create(record) => {
                let result = workspace.create_lecture(database_id, &record).await;
                self.after_mutation().await;
                match result {
                    Ok(_) => OutcomeKind::Created,
                    Err(err) => OutcomeKind::Failed(format!("create: {err}")),
                }
            }
            Decision::UpdateSelection { remote_id, field } => {
                let result = workspace.update_selection(&remote_id, &field).await;
                self.after_mutation().await;
                match result {
                    Ok(()) => OutcomeKind::SelectionUpdated,
                    Err(err) => OutcomeKind::Failed(format!("update selection: {err}")),
                }
            }
            Decision::UpdateNumber { remote_id, title } => {
                let result = workspace.rename_lecture(&remote_id, &title).await;
                self.after_mutation().await;
                match result {
                    Ok(()) => OutcomeKind::NumberRepaired,
                    Err(err) => OutcomeKind::Failed(format!("rename: {err}")),
                }
            }
            Decision::NoOp(reason) => OutcomeKind::Skipped(reason.to_string()),
        }
    }

    /// Record one finished item in the job store, summary, and progress bus.
    async fn finish_item(
        &self,
        job_id: Uuid,
        user: User,
        lecture: &Lecture,
        kind: OutcomeKind,
        summary: &mut SyncSummary,
        portion_len: usize,
    ) {
        let text = match &kind {
            OutcomeKind::Skipped(reason) => format!(
                "{}: {} skipped ({reason})",
                user.display_name(),
                lecture.numbered_title()
            ),
            OutcomeKind::Failed(err) => format!(
                "{}: {} failed ({err})",
                user.display_name(),
                lecture.numbered_title()
            ),
            other => format!(
                "{}: {} {}",
                user.display_name(),
                lecture.numbered_title(),
                other.label()
            ),
        };
        self.jobs
            .append_progress(job_id, 1, kind.level(), text)
            .await;

        let (processed, total) = match self.jobs.get_job(job_id).await {
            Some(job) => (job.processed_items, job.total_items),
            None => (0, portion_len * User::ALL.len()),
        };
        self.progress.publish(ProgressEvent {
            job_id,
            user,
            lecture_title: lecture.numbered_title(),
            outcome: kind.label().to_string(),
            processed,
            total,
            ts: Utc::now(),
        });

        summary.record(ItemOutcome {
            user,
            lecture_id: lecture.id,
            title: lecture.numbered_title(),
            kind,
        });
    }

    async fn after_mutation(&self) {
        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }
    }
}

fn user_name(user: User) -> &'static str {
    user.display_name()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
