use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use nt_core::types::SelectionSet;

/// Property names inside each user's lecture database. The databases are
/// human-created from a shared template, so these are fixed by convention.
pub const TITLE_PROPERTY: &str = "Namn";
pub const SELECTION_PROPERTY: &str = "Notionerat";
pub const DATE_PROPERTY: &str = "Datum";

// ---------------------------------------------------------------------------
// Remote types
// ---------------------------------------------------------------------------

/// A Notion page, reduced to what the sync engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionPage {
    pub id: String,
    pub archived: bool,
    pub url: Option<String>,
}

/// A child database discovered under a user's root page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionDatabase {
    pub id: String,
    pub title: String,
}

/// One lecture row inside a user's database.
///
/// `selection_field` is the raw rich-text value (e.g. `"D, A"`); parsing it
/// into a [`SelectionSet`] happens at the reconcile boundary so that a
/// malformed cell degrades into an empty set instead of a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub remote_id: String,
    pub title: String,
    pub selection_field: String,
}

impl RemoteRecord {
    pub fn selections(&self) -> SelectionSet {
        SelectionSet::parse(&self.selection_field)
    }

    /// Extract a record from a page object returned by a database query.
    pub fn from_page(page: &serde_json::Value) -> RemoteRecord {
        let title = page["properties"][TITLE_PROPERTY]["title"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["plain_text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();
        let selection_field = page["properties"][SELECTION_PROPERTY]["rich_text"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["plain_text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        RemoteRecord {
            remote_id: page["id"].as_str().unwrap_or_default().to_string(),
            title,
            selection_field,
        }
    }
}

/// Payload for creating a new lecture page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub title: String,
    pub selection_field: String,
    pub date: Option<NaiveDate>,
}

impl NewRecord {
    /// Build the `properties` object for a page create/update call.
    pub fn properties(&self) -> serde_json::Value {
        let mut props = serde_json::json!({
            (TITLE_PROPERTY): title_property(&self.title),
            (SELECTION_PROPERTY): selection_property(&self.selection_field),
        });
        if let Some(date) = self.date {
            props[DATE_PROPERTY] = serde_json::json!({
                "date": { "start": date.format("%Y-%m-%d").to_string() }
            });
        }
        props
    }
}

/// Build a title property value.
pub fn title_property(title: &str) -> serde_json::Value {
    serde_json::json!({
        "title": [ { "text": { "content": title } } ]
    })
}

/// Build the selection rich-text property value.
pub fn selection_property(field: &str) -> serde_json::Value {
    serde_json::json!({
        "rich_text": [ { "text": { "content": field } } ]
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nt_core::types::User;

    fn sample_page() -> serde_json::Value {
        serde_json::json!({
            "id": "page-abc",
            "archived": false,
            "properties": {
                "Namn": {
                    "title": [
                        { "plain_text": "12. " },
                        { "plain_text": "Kardiologi" }
                    ]
                },
                "Notionerat": {
                    "rich_text": [ { "plain_text": "D, A" } ]
                }
            }
        })
    }

    #[test]
    fn from_page_joins_rich_text_parts() {
        let record = RemoteRecord::from_page(&sample_page());
        assert_eq!(record.remote_id, "page-abc");
        assert_eq!(record.title, "12. Kardiologi");
        assert_eq!(record.selection_field, "D, A");
        assert!(record.selections().contains(User::David));
        assert!(record.selections().contains(User::Adam));
        assert!(!record.selections().contains(User::Gustav));
    }

    #[test]
    fn from_page_tolerates_missing_properties() {
        let record = RemoteRecord::from_page(&serde_json::json!({ "id": "p" }));
        assert_eq!(record.remote_id, "p");
        assert_eq!(record.title, "");
        assert!(record.selections().is_empty());
    }

    #[test]
    fn new_record_properties_shape() {
        let record = NewRecord {
            title: "12. Kardiologi".into(),
            selection_field: "D".into(),
            date: Some(NaiveDate::from_ymd_opt(2026, 3, 12).unwrap()),
        };
        let props = record.properties();
        assert_eq!(
            props["Namn"]["title"][0]["text"]["content"],
            "12. Kardiologi"
        );
        assert_eq!(props["Notionerat"]["rich_text"][0]["text"]["content"], "D");
        assert_eq!(props["Datum"]["date"]["start"], "2026-03-12");
    }

    #[test]
    fn new_record_without_date_omits_property() {
        let record = NewRecord {
            title: "1. Intro".into(),
            selection_field: String::new(),
            date: None,
        };
        let props = record.properties();
        assert!(props.get("Datum").is_none());
    }
}
