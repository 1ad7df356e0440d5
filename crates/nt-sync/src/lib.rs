//! The synchronization engine: keeps the shared lecture roster consistent
//! with three independently-owned Notion workspaces.
//!
//! The flow is reconcile-then-apply per (user, lecture) pair: search the
//! user's database by title, let the pure [`reconcile`] function decide
//! between create / update-selection / update-number / no-op, then apply
//! the decision through the retrying workspace gateway. Progress lands in
//! the pollable [`JobStore`] after every item so a client can follow a
//! multi-minute run without an open connection.

pub mod coordinator;
pub mod gateway;
pub mod job;
pub mod progress;
pub mod reconcile;

pub use coordinator::{ItemOutcome, OutcomeKind, SyncCoordinator, SyncSummary};
pub use gateway::{NotionWorkspaceFactory, Workspace, WorkspaceFactory};
pub use job::{Job, JobMessage, JobStatus, JobStore, MessageLevel};
pub use progress::{ProgressBus, ProgressEvent};
pub use reconcile::{reconcile, Decision, SyncIntent};
