use std::sync::Arc;
use std::time::Instant;

use nt_core::config::Config;
use nt_core::roster::MemoryRoster;
use nt_sync::{JobStore, ProgressBus};

use crate::worker::SyncRequest;

/// Shared state handed to every HTTP handler.
///
/// Handlers never run sync work themselves: mutations to the roster happen
/// inline, and anything that touches Notion is enqueued onto `queue_tx` for
/// the background worker, with a job id handed back for polling.
pub struct AppState {
    pub roster: Arc<MemoryRoster>,
    pub jobs: JobStore,
    pub progress: ProgressBus,
    pub queue_tx: flume::Sender<SyncRequest>,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, queue_tx: flume::Sender<SyncRequest>) -> Self {
        Self {
            roster: Arc::new(MemoryRoster::new()),
            jobs: JobStore::new(),
            progress: ProgressBus::new(),
            queue_tx,
            config,
            start_time: Instant::now(),
        }
    }
}
