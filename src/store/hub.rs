use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::Document;

/// Full result set of one collection at a commit point.
pub type Snapshot = Arc<Vec<Document>>;

const DEFAULT_CAPACITY: usize = 64;

/// A snapshot tagged with the sequence number taken when it was read.
#[derive(Debug, Clone)]
pub struct Published {
    sequence: u64,
    documents: Snapshot,
}

/// Fan-out of committed collection snapshots to live subscriptions.
///
/// A store takes [`SubscriptionHub::next_sequence`] after a commit and only
/// then reads the result set it publishes. A snapshot with a higher sequence
/// therefore contains every commit of the lower ones, and subscriptions drop
/// anything older than what they already delivered, even when concurrent
/// writers publish out of order.
#[derive(Debug)]
pub struct SubscriptionHub {
    capacity: usize,
    sequence: AtomicU64,
    channels: Mutex<HashMap<String, broadcast::Sender<Published>>>,
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SubscriptionHub {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sequence: AtomicU64::new(0),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a receiver. Call before reading the initial snapshot so no
    /// commit can fall between the read and the registration.
    pub fn receiver(&self, collection: &str) -> broadcast::Receiver<Published> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn has_subscribers(&self, collection: &str) -> bool {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .get(collection)
            .is_some_and(|tx| tx.receiver_count() > 0)
    }

    /// Last sequence handed out. Read it before loading an initial snapshot.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Call after the commit and before reading the snapshot to publish.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn publish(&self, collection: &str, sequence: u64, documents: Vec<Document>) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = channels.get(collection) else {
            return;
        };

        let published = Published {
            sequence,
            documents: Arc::new(documents),
        };
        if tx.send(published).is_err() {
            // every subscription was released
            channels.remove(collection);
            debug!(collection, "dropped idle subscription channel");
        }
    }
}

/// Live view of one collection: yields the result set current at subscribe
/// time, then every committed result set after it.
#[derive(Debug)]
pub struct Subscription {
    collection: String,
    initial: Option<Snapshot>,
    seen: u64,
    rx: broadcast::Receiver<Published>,
}

impl Subscription {
    /// `seen` is the hub sequence read before `initial` was loaded.
    pub fn new(collection: &str, initial: Vec<Document>, seen: u64, rx: broadcast::Receiver<Published>) -> Self {
        Self {
            collection: collection.to_string(),
            initial: Some(Arc::new(initial)),
            seen,
            rx,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Next result set, or `None` once the store is gone. A subscriber that
    /// falls behind skips straight to newer snapshots; stale ones are dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.rx.recv().await {
                Ok(published) if published.sequence <= self.seen => {
                    debug!(collection = %self.collection, sequence = published.sequence, "dropped stale snapshot");
                }
                Ok(published) => {
                    self.seen = published.sequence;
                    return Some(published.documents);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(collection = %self.collection, skipped, "subscription lagged, skipping to newer snapshot");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Releases the standing watch.
    pub fn unsubscribe(self) {
        debug!(collection = %self.collection, "subscription released");
    }
}
