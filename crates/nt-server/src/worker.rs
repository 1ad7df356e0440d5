use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use uuid::Uuid;

use nt_core::config::CredentialProvider;
use nt_core::types::{Lecture, User};
use nt_sync::{ProgressBus, SyncCoordinator, WorkspaceFactory};

use crate::state::AppState;

/// One unit of work handed from an HTTP handler to the background worker.
#[derive(Debug)]
pub enum SyncRequest {
    /// Seed every lecture into every user's workspace.
    BulkSync { job_id: Uuid, lectures: Vec<Lecture> },
    /// Propagate one user's selection toggle on one lecture.
    SelectionSync {
        job_id: Uuid,
        lecture: Box<Lecture>,
        user: User,
        selected: bool,
    },
}

/// Spawn the background worker that drains the sync queue.
///
/// Requests run one at a time; the queue orders concurrent sync triggers so
/// two jobs never interleave remote calls against the same workspace.
pub fn spawn_sync_worker(
    state: Arc<AppState>,
    credentials: Arc<dyn CredentialProvider>,
    workspaces: Arc<dyn WorkspaceFactory>,
    queue_rx: flume::Receiver<SyncRequest>,
) {
    let throttle = Duration::from_millis(state.config.sync.throttle_ms);
    let coordinator = SyncCoordinator::new(
        credentials,
        workspaces,
        state.jobs.clone(),
        state.progress.clone(),
        throttle,
    );

    tokio::spawn(async move {
        info!("sync worker started");
        while let Ok(request) = queue_rx.recv_async().await {
            match request {
                SyncRequest::BulkSync { job_id, lectures } => {
                    info!(%job_id, lectures = lectures.len(), "bulk sync starting");
                    coordinator.run_bulk_sync(job_id, &lectures).await;
                }
                SyncRequest::SelectionSync {
                    job_id,
                    lecture,
                    user,
                    selected,
                } => {
                    info!(
                        %job_id,
                        user = user.display_name(),
                        lecture = %lecture.numbered_title(),
                        selected,
                        "selection sync starting"
                    );
                    coordinator
                        .run_selection_sync(job_id, &lecture, user, selected)
                        .await;
                }
            }
        }
        info!("sync queue closed; worker exiting");
    });
}

/// Spawn a task that mirrors progress events into the server log.
pub fn spawn_progress_logger(progress: &ProgressBus) {
    let rx = progress.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv_async().await {
            debug!(
                job_id = %event.job_id,
                user = event.user.display_name(),
                lecture = %event.lecture_title,
                outcome = %event.outcome,
                progress = format!("{}/{}", event.processed, event.total),
                "sync progress"
            );
            if event.outcome == "failed" {
                error!(
                    job_id = %event.job_id,
                    lecture = %event.lecture_title,
                    "sync item failed"
                );
            }
        }
    });
}
