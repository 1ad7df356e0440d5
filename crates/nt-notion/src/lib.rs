//! Typed wrapper around the Notion HTTP API plus the bounded-retry executor.
//!
//! One [`NotionClient`] is created per user credential; each user's roster
//! copy lives in a child database under a root page they own. All requests
//! classify failures into the [`NotionError`] taxonomy so the sync engine
//! can distinguish retryable from fail-fast conditions.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::NotionClient;
pub use error::{NotionError, Result};
pub use retry::{RetryExecutor, RetryPolicy};
pub use types::{NewRecord, NotionDatabase, NotionPage, RemoteRecord};
