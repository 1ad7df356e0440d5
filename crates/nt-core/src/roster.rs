use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{Lecture, User};

/// Read surface the sync engine needs from the lecture roster.
///
/// The engine never mutates the roster; creation, deletion and selection
/// edits happen at the HTTP boundary before a sync job is enqueued.
#[async_trait]
pub trait LectureStore: Send + Sync {
    async fn list_lectures(&self) -> Vec<Lecture>;
    async fn get_lecture(&self, id: Uuid) -> Option<Lecture>;
}

/// In-memory roster keyed by lecture id.
#[derive(Default)]
pub struct MemoryRoster {
    lectures: Arc<RwLock<HashMap<Uuid, Lecture>>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, lecture: Lecture) {
        self.lectures.write().await.insert(lecture.id, lecture);
    }

    pub async fn remove(&self, id: Uuid) -> Option<Lecture> {
        self.lectures.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.lectures.read().await.len()
    }

    /// Flip one user's selection flag, returning the updated lecture.
    /// `None` when the lecture does not exist.
    pub async fn set_selection(&self, id: Uuid, user: User, selected: bool) -> Option<Lecture> {
        let mut lectures = self.lectures.write().await;
        let lecture = lectures.get_mut(&id)?;
        lecture.selections.set(user, selected);
        Some(lecture.clone())
    }
}

#[async_trait]
impl LectureStore for MemoryRoster {
    async fn list_lectures(&self) -> Vec<Lecture> {
        let mut all: Vec<Lecture> = self.lectures.read().await.values().cloned().collect();
        all.sort_by_key(|l| l.lecture_number);
        all
    }

    async fn get_lecture(&self, id: Uuid) -> Option<Lecture> {
        self.lectures.read().await.get(&id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
