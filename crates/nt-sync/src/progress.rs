use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nt_core::types::User;

/// One per-item progress notification emitted by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub user: User,
    pub lecture_title: String,
    pub outcome: String,
    pub processed: usize,
    pub total: usize,
    pub ts: DateTime<Utc>,
}

/// A broadcast-style progress bus built on flume channels.
///
/// Each [`subscribe`](ProgressBus::subscribe) call creates a receiver that
/// sees every event published afterwards. This is the explicit event channel
/// that replaces inferring progress from intercepted log output: the
/// coordinator publishes here in addition to persisting into the job store.
#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<Mutex<Vec<flume::Sender<ProgressEvent>>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> flume::Receiver<ProgressEvent> {
        let (tx, rx) = flume::unbounded();
        let mut senders = self.inner.lock().expect("ProgressBus lock poisoned");
        senders.push(tx);
        rx
    }

    /// Publish an event to all current subscribers, pruning disconnected ones.
    pub fn publish(&self, event: ProgressEvent) {
        let mut senders = self.inner.lock().expect("ProgressBus lock poisoned");
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let senders = self.inner.lock().expect("ProgressBus lock poisoned");
        senders.len()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(processed: usize) -> ProgressEvent {
        ProgressEvent {
            job_id: Uuid::new_v4(),
            user: User::David,
            lecture_title: "12. Kardiologi".into(),
            outcome: "created".into(),
            processed,
            total: 3,
            ts: Utc::now(),
        }
    }

    #[test]
    fn subscribers_receive_published_events() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe();

        bus.publish(event(1));
        bus.publish(event(2));

        assert_eq!(rx.try_recv().unwrap().processed, 1);
        assert_eq!(rx.try_recv().unwrap().processed, 2);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        bus.publish(event(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = ProgressBus::new();
        bus.publish(event(1));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
