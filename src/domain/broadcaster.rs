//! Fan-out of snapshots to connected subscribers.
//!
//! [`Broadcaster`] wraps a [`tokio::sync::broadcast`] channel carrying
//! `Arc<Snapshot>` and keeps the set of registered subscriber handles.
//! A subscriber only receives snapshots published after it connected;
//! there is no replay.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use super::{Snapshot, SubscriberId};

type SubscriberSet = Arc<Mutex<HashSet<SubscriberId>>>;

/// Broadcast hub for [`Snapshot`]s.
///
/// Cloning is cheap; all clones share the same channel and subscriber set.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<Arc<Snapshot>>,
    subscribers: SubscriberSet,
}

impl Broadcaster {
    /// Creates a new `Broadcaster` buffering up to `capacity` snapshots
    /// per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscribers: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Registers a new subscriber.
    ///
    /// The returned [`Subscription`] unregisters itself when dropped.
    #[must_use]
    pub fn connect(&self) -> Subscription {
        let id = SubscriberId::new();
        let receiver = self.sender.subscribe();
        let total = {
            let mut set = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            set.insert(id);
            set.len()
        };
        tracing::info!(subscriber = %id, total, "subscriber connected");
        Subscription {
            id,
            receiver,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Publishes a snapshot to every currently connected subscriber.
    ///
    /// Returns the number of receivers the snapshot was queued for. With
    /// no receivers the snapshot is silently dropped.
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> usize {
        self.sender.send(snapshot).unwrap_or(0)
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A registered subscriber: its handle and its snapshot receiver.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: broadcast::Receiver<Arc<Snapshot>>,
    subscribers: SubscriberSet,
}

impl Subscription {
    /// Handle assigned on connect.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Lagged`] when the subscriber
    /// fell behind and snapshots were skipped, or `Closed` once every
    /// [`Broadcaster`] clone is gone.
    pub async fn recv(&mut self) -> Result<Arc<Snapshot>, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let remaining = {
            let mut set = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            set.remove(&self.id);
            set.len()
        };
        tracing::info!(subscriber = %self.id, remaining, "subscriber disconnected");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot() -> Arc<Snapshot> {
        Arc::new(Snapshot::build(Utc::now(), vec![]))
    }

    #[test]
    fn publish_without_subscribers_returns_zero() {
        let broadcaster = Broadcaster::new(4);
        assert_eq!(broadcaster.publish(snapshot()), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_snapshot() {
        let broadcaster = Broadcaster::new(4);
        let mut first = broadcaster.connect();
        let mut second = broadcaster.connect();

        let sent = snapshot();
        assert_eq!(broadcaster.publish(Arc::clone(&sent)), 2);

        let Ok(a) = first.recv().await else {
            panic!("first subscriber missed the snapshot");
        };
        let Ok(b) = second.recv().await else {
            panic!("second subscriber missed the snapshot");
        };
        assert_eq!(a.sort_key(), sent.sort_key());
        assert_eq!(b.sort_key(), sent.sort_key());
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_history() {
        let broadcaster = Broadcaster::new(4);
        let _early = broadcaster.connect();
        broadcaster.publish(snapshot());

        let mut late = broadcaster.connect();
        let fresh = Arc::new(Snapshot::build(Utc::now() + chrono::TimeDelta::seconds(5), vec![]));
        broadcaster.publish(Arc::clone(&fresh));

        let Ok(received) = late.recv().await else {
            panic!("late subscriber missed the fresh snapshot");
        };
        assert_eq!(received.sort_key(), fresh.sort_key());
    }

    #[tokio::test]
    async fn subscribers_observe_cycle_order() {
        let broadcaster = Broadcaster::new(4);
        let mut rx = broadcaster.connect();
        let now = Utc::now();
        for offset in 0..3 {
            broadcaster.publish(Arc::new(Snapshot::build(
                now + chrono::TimeDelta::seconds(offset * 5),
                vec![],
            )));
        }

        let mut keys = Vec::new();
        for _ in 0..3 {
            let Ok(s) = rx.recv().await else {
                panic!("missing snapshot");
            };
            keys.push(s.sort_key().to_string());
        }
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let broadcaster = Broadcaster::new(4);
        assert_eq!(broadcaster.subscriber_count(), 0);

        let first = broadcaster.connect();
        let _second = broadcaster.connect();
        assert_eq!(broadcaster.subscriber_count(), 2);
        assert_ne!(first.id(), _second.id());

        drop(first);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }
}
