use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use nt_core::roster::LectureStore;
use nt_core::types::{Lecture, User};

use crate::state::AppState;
use crate::worker::SyncRequest;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    version: String,
    uptime_seconds: u64,
    lecture_count: usize,
    job_count: usize,
    queue_depth: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncTriggerRequest {
    /// Restrict the run to these lecture ids; empty means the whole roster.
    #[serde(default)]
    lecture_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLectureRequest {
    lecture_number: u32,
    title: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionRequest {
    user: User,
    selected: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the full API router.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/lectures", get(list_lectures))
        .route("/api/lectures", post(create_lecture))
        .route("/api/lectures/{id}", delete(delete_lecture))
        .route("/api/lectures/{id}/selection", post(set_selection))
        .route("/api/sync", post(trigger_sync))
        .route("/api/sync/jobs/{id}", get(get_sync_job))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/status -- basic server health and statistics.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        lecture_count: state.roster.len().await,
        job_count: state.jobs.len().await,
        queue_depth: state.queue_tx.len(),
    })
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// GET /api/lectures -- the roster, sorted by lecture number.
async fn list_lectures(State(state): State<Arc<AppState>>) -> Json<Vec<Lecture>> {
    Json(state.roster.list_lectures().await)
}

/// POST /api/lectures -- add a lecture to the local roster.
///
/// Purely local; nothing reaches Notion until a sync is triggered.
async fn create_lecture(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewLectureRequest>,
) -> impl IntoResponse {
    let mut lecture = Lecture::new(req.lecture_number, req.title);
    lecture.date = req.date;
    lecture.time = req.time;
    state.roster.upsert(lecture.clone()).await;
    (StatusCode::CREATED, Json(lecture))
}

/// DELETE /api/lectures/{id} -- remove a lecture from the local roster.
///
/// Remote records are left alone: deletion is a local roster edit, never a
/// remote destruction.
async fn delete_lecture(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.roster.remove(id).await {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

// ---------------------------------------------------------------------------
// Sync triggers
// ---------------------------------------------------------------------------

/// POST /api/sync -- start a bulk sync job, over the whole roster or an
/// explicit subset of lecture ids.
///
/// Returns `202 Accepted` with a job id immediately; progress is polled via
/// `GET /api/sync/jobs/{id}`.
async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SyncTriggerRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let mut lectures = state.roster.list_lectures().await;
    if !req.lecture_ids.is_empty() {
        lectures.retain(|l| req.lecture_ids.contains(&l.id));
    }
    let total = lectures.len() * User::ALL.len();
    let job_id = state.jobs.create_job(total).await;

    if state
        .queue_tx
        .send(SyncRequest::BulkSync { job_id, lectures })
        .is_err()
    {
        state.jobs.fail(job_id, "sync worker unavailable").await;
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "sync worker unavailable" })),
        );
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "job_id": job_id, "total_items": total })),
    )
}

/// POST /api/lectures/{id}/selection -- toggle one user's selection.
///
/// Applies the toggle to the local roster first, then enqueues a three-item
/// job that propagates it to every workspace.
async fn set_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectionRequest>,
) -> impl IntoResponse {
    let Some(lecture) = state.roster.set_selection(id, req.user, req.selected).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "lecture not found" })),
        );
    };

    let job_id = state.jobs.create_job(User::ALL.len()).await;
    if state
        .queue_tx
        .send(SyncRequest::SelectionSync {
            job_id,
            lecture: Box::new(lecture),
            user: req.user,
            selected: req.selected,
        })
        .is_err()
    {
        state.jobs.fail(job_id, "sync worker unavailable").await;
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "sync worker unavailable" })),
        );
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "job_id": job_id })),
    )
}

/// GET /api/sync/jobs/{id} -- poll a sync job.
async fn get_sync_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.jobs.get_job(id).await {
        Some(job) => (StatusCode::OK, Json(serde_json::json!(job))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "job not found" })),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
