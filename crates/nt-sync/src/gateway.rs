use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use nt_core::config::Credential;
use nt_core::title::title_matches;
use nt_core::types::Lecture;
use nt_notion::{NewRecord, NotionClient, RemoteRecord, Result, RetryExecutor, RetryPolicy};

/// The coordinator's view of one user's remote workspace.
///
/// Production code talks to Notion through [`NotionWorkspace`]; tests swap in
/// scripted implementations so reconciliation paths run without a network.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Locate the lecture database under the user's root page.
    async fn find_lecture_database(&self) -> Result<String>;

    /// Fetch remote records that could correspond to the given lecture.
    async fn search_lecture(&self, database_id: &str, lecture: &Lecture)
        -> Result<Vec<RemoteRecord>>;

    /// Create a new lecture record, including its note skeleton.
    async fn create_lecture(&self, database_id: &str, record: &NewRecord) -> Result<RemoteRecord>;

    /// Overwrite the selection field of an existing record.
    async fn update_selection(&self, remote_id: &str, field: &str) -> Result<()>;

    /// Rewrite a record's title, used when lecture numbering has drifted.
    async fn rename_lecture(&self, remote_id: &str, title: &str) -> Result<()>;
}

/// Opens a [`Workspace`] for a resolved credential.
pub trait WorkspaceFactory: Send + Sync {
    fn open(&self, credential: &Credential) -> Result<Arc<dyn Workspace>>;
}

// ---------------------------------------------------------------------------
// Notion-backed implementation
// ---------------------------------------------------------------------------

/// [`Workspace`] backed by the real Notion API, with retry on transient
/// failures around every call.
pub struct NotionWorkspace {
    client: NotionClient,
    root_page_id: String,
    retry: RetryExecutor,
}

impl NotionWorkspace {
    pub fn new(client: NotionClient, root_page_id: String, policy: RetryPolicy) -> Self {
        Self {
            client,
            root_page_id,
            retry: RetryExecutor::new(policy),
        }
    }
}

#[async_trait]
impl Workspace for NotionWorkspace {
    async fn find_lecture_database(&self) -> Result<String> {
        let root = self
            .retry
            .run(|| self.client.get_page(&self.root_page_id))
            .await?;
        if root.archived {
            return Err(nt_notion::NotionError::NotFound(format!(
                "root page {} is archived",
                self.root_page_id
            )));
        }
        let db = self
            .retry
            .run(|| self.client.find_child_database(&self.root_page_id))
            .await?;
        debug!(database_id = %db.id, title = %db.title, "resolved lecture database");
        Ok(db.id)
    }

    async fn search_lecture(
        &self,
        database_id: &str,
        lecture: &Lecture,
    ) -> Result<Vec<RemoteRecord>> {
        // No server-side title filter: a `contains` needle on the local title
        // misses records whose remote title is a shorter form of it (partial
        // renames), and a needle on the number misses drifted numbering. All
        // narrowing happens locally through the matching rules.
        let candidates = self
            .retry
            .run(|| self.client.query_database(database_id))
            .await?;
        Ok(matching_candidates(lecture, candidates))
    }

    async fn create_lecture(&self, database_id: &str, record: &NewRecord) -> Result<RemoteRecord> {
        let created = self
            .retry
            .run(|| self.client.create_record(database_id, record))
            .await?;
        // A freshly created page gets the standard note skeleton appended so
        // it is immediately usable for note-taking.
        self.retry
            .run(|| {
                self.client.append_children(
                    &created.remote_id,
                    nt_notion::client::note_skeleton(&record.title),
                )
            })
            .await?;
        Ok(created)
    }

    async fn update_selection(&self, remote_id: &str, field: &str) -> Result<()> {
        self.retry
            .run(|| self.client.update_selection(remote_id, field))
            .await
    }

    async fn rename_lecture(&self, remote_id: &str, title: &str) -> Result<()> {
        self.retry
            .run(|| self.client.rename_record(remote_id, title))
            .await
    }
}

/// Narrow raw query results to the records the matching rules accept.
///
/// This is the only narrowing between a database query and the reconciler:
/// anything dropped here (or upstream) can never be deduplicated against,
/// so the filter must accept every form `title_matches` accepts.
fn matching_candidates(lecture: &Lecture, candidates: Vec<RemoteRecord>) -> Vec<RemoteRecord> {
    candidates
        .into_iter()
        .filter(|r| title_matches(lecture.lecture_number, &lecture.title, &r.title))
        .collect()
}

/// Factory producing [`NotionWorkspace`] instances against a fixed API
/// endpoint and retry policy.
pub struct NotionWorkspaceFactory {
    api_base: String,
    api_version: String,
    policy: RetryPolicy,
}

impl NotionWorkspaceFactory {
    pub fn new(api_base: impl Into<String>, api_version: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            api_base: api_base.into(),
            api_version: api_version.into(),
            policy,
        }
    }
}

impl WorkspaceFactory for NotionWorkspaceFactory {
    fn open(&self, credential: &Credential) -> Result<Arc<dyn Workspace>> {
        let client = NotionClient::new(&credential.token, &self.api_base, &self.api_version)?;
        Ok(Arc::new(NotionWorkspace::new(
            client,
            credential.root_page_id.clone(),
            self.policy,
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(title: &str) -> RemoteRecord {
        RemoteRecord {
            remote_id: format!("page-{title}"),
            title: title.into(),
            selection_field: String::new(),
        }
    }

    #[test]
    fn narrowing_keeps_shorter_remote_title() {
        // The lecture was renamed locally with an extension; the remote
        // record still carries the shorter original title and must be kept
        // or the seed pass would create a duplicate next to it.
        let lecture = Lecture::new(12, "Kardiologi och EKG");
        let kept = matching_candidates(
            &lecture,
            vec![remote("12. Kardiologi"), remote("12. Njurmedicin")],
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "12. Kardiologi");
    }

    #[test]
    fn narrowing_keeps_drifted_number() {
        let lecture = Lecture::new(12, "Kardiologi");
        let kept = matching_candidates(&lecture, vec![remote("11. Kardiologi")]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn narrowing_drops_unrelated_records() {
        let lecture = Lecture::new(12, "Kardiologi");
        let kept = matching_candidates(
            &lecture,
            vec![remote("12. Njurmedicin"), remote("Kardiologi fördjupning")],
        );
        assert!(kept.is_empty());
    }
}
