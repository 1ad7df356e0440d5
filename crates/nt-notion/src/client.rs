use serde_json::json;
use tracing::debug;

use crate::error::{NotionError, Result};
use crate::types::{
    selection_property, title_property, NewRecord, NotionDatabase, NotionPage, RemoteRecord,
    TITLE_PROPERTY,
};

/// Thin typed wrapper around one user's Notion workspace.
///
/// One logical instance per user credential. The base URL is injectable so
/// tests and local proxies can point it elsewhere.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    api_version: String,
}

impl NotionClient {
    pub fn new(token: &str, base_url: &str, api_version: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(NotionError::MissingToken);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    // -- request plumbing ---------------------------------------------------

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
    }

    /// Read the response body, mapping non-success statuses onto the error
    /// taxonomy before attempting to parse JSON.
    async fn read_body(resp: reqwest::Response) -> Result<serde_json::Value> {
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(NotionError::from_status(status, &text));
        }
        Ok(serde_json::from_str(&text)?)
    }

    // -- page & database discovery ------------------------------------------

    /// Retrieve a page by id.
    pub async fn get_page(&self, page_id: &str) -> Result<NotionPage> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/v1/pages/{page_id}"))
            .send()
            .await?;
        let body = Self::read_body(resp).await?;

        Ok(NotionPage {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            archived: body["archived"].as_bool().unwrap_or(false),
            url: body["url"].as_str().map(|s| s.to_string()),
        })
    }

    /// Find the first child database under a root page.
    ///
    /// The roster template puts exactly one lecture database directly under
    /// each user's root page; anything else is a setup problem surfaced as
    /// `NotFound`.
    pub async fn find_child_database(&self, page_id: &str) -> Result<NotionDatabase> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/blocks/{page_id}/children?page_size=100"),
            )
            .send()
            .await?;
        let body = Self::read_body(resp).await?;

        let blocks = body["results"]
            .as_array()
            .ok_or_else(|| NotionError::InvalidRequest("missing results array".into()))?;

        blocks
            .iter()
            .find(|b| b["type"].as_str() == Some("child_database"))
            .map(|b| NotionDatabase {
                id: b["id"].as_str().unwrap_or_default().to_string(),
                title: b["child_database"]["title"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            })
            .ok_or_else(|| {
                NotionError::NotFound(format!("no child database under page {page_id}"))
            })
    }

    // -- queries ------------------------------------------------------------

    /// Query a database, returning raw records in query order.
    ///
    /// Deliberately unfiltered: any server-side title filter risks hiding a
    /// record that the local matching rules would accept (partial renames,
    /// drifted numbering). Narrowing happens upstream.
    pub async fn query_database(&self, database_id: &str) -> Result<Vec<RemoteRecord>> {
        let payload = json!({ "page_size": 100 });

        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/databases/{database_id}/query"),
            )
            .json(&payload)
            .send()
            .await?;
        let body = Self::read_body(resp).await?;

        let pages = body["results"]
            .as_array()
            .ok_or_else(|| NotionError::InvalidRequest("missing results array".into()))?;

        let records = pages
            .iter()
            .filter(|p| !p["archived"].as_bool().unwrap_or(false))
            .map(RemoteRecord::from_page)
            .collect();
        Ok(records)
    }

    // -- mutations ----------------------------------------------------------

    /// Create a lecture page inside a database.
    pub async fn create_record(
        &self,
        database_id: &str,
        record: &NewRecord,
    ) -> Result<RemoteRecord> {
        let payload = json!({
            "parent": { "database_id": database_id },
            "properties": record.properties(),
        });

        let resp = self
            .request(reqwest::Method::POST, "/v1/pages")
            .json(&payload)
            .send()
            .await?;
        let body = Self::read_body(resp).await?;

        debug!(database_id, title = %record.title, "created remote record");
        Ok(RemoteRecord::from_page(&body))
    }

    /// Patch arbitrary properties on an existing page.
    pub async fn update_properties(
        &self,
        page_id: &str,
        properties: serde_json::Value,
    ) -> Result<()> {
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/v1/pages/{page_id}"))
            .json(&json!({ "properties": properties }))
            .send()
            .await?;
        Self::read_body(resp).await?;
        Ok(())
    }

    /// Overwrite the selection field of a record.
    pub async fn update_selection(&self, page_id: &str, field: &str) -> Result<()> {
        self.update_properties(
            page_id,
            json!({ (crate::types::SELECTION_PROPERTY): selection_property(field) }),
        )
        .await
    }

    /// Rename a record (numbering repair).
    pub async fn rename_record(&self, page_id: &str, title: &str) -> Result<()> {
        self.update_properties(page_id, json!({ (TITLE_PROPERTY): title_property(title) }))
            .await
    }

    /// Append note-skeleton blocks under a page.
    pub async fn append_children(
        &self,
        page_id: &str,
        children: Vec<serde_json::Value>,
    ) -> Result<()> {
        let resp = self
            .request(
                reqwest::Method::PATCH,
                &format!("/v1/blocks/{page_id}/children"),
            )
            .json(&json!({ "children": children }))
            .send()
            .await?;
        Self::read_body(resp).await?;
        Ok(())
    }
}

/// The standard note skeleton appended under a freshly created lecture page:
/// a heading plus an empty toggle for each user's flashcard notes.
pub fn note_skeleton(title: &str) -> Vec<serde_json::Value> {
    let mut blocks = vec![json!({
        "object": "block",
        "type": "heading_2",
        "heading_2": {
            "rich_text": [ { "text": { "content": title } } ]
        }
    })];
    for user in nt_core::types::User::ALL {
        blocks.push(json!({
            "object": "block",
            "type": "toggle",
            "toggle": {
                "rich_text": [ { "text": { "content": user.display_name() } } ]
            }
        }));
    }
    blocks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
