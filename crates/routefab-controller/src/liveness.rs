use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;

use routefab_core::NodeName;

/// Per-node registration deadlines.
///
/// Each node has a single authoritative entry: its current generation. A
/// refresh bumps the generation and arms a fresh timer carrying the value it
/// observed; when the timer fires it may evict only if the stored generation
/// is still its own. A refresh racing an in-flight expiry therefore either
/// wins (the stale timer finds a newer generation and stands down) or loses
/// cleanly (the expiry already removed the entry and the node re-registers
/// through admission). A node is never both refreshed and evicted out of
/// the same TTL window.
pub struct LivenessTracker {
    ttl: Duration,
    generations: Arc<DashMap<NodeName, u64>>,
    counter: AtomicU64,
    expired_tx: mpsc::UnboundedSender<NodeName>,
}

impl LivenessTracker {
    /// Create a tracker. Expired node names are delivered on the returned
    /// receiver, in eviction order, exactly once per expiry.
    pub fn new(ttl: Duration) -> (Self, mpsc::UnboundedReceiver<NodeName>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        (
            Self {
                ttl,
                generations: Arc::new(DashMap::new()),
                counter: AtomicU64::new(0),
                expired_tx,
            },
            expired_rx,
        )
    }

    /// Push the node's deadline out to `now + TTL`, superseding any timer
    /// already in flight.
    pub fn refresh(&self, name: NodeName) {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.insert(name.clone(), generation);
        tracing::debug!(%name, generation, "liveness refreshed");

        let generations = Arc::clone(&self.generations);
        let expired_tx = self.expired_tx.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let evicted = generations
                .remove_if(&name, |_, current| *current == generation)
                .is_some();
            if evicted {
                let _ = expired_tx.send(name);
            }
        });
    }

    /// Stop tracking a node without signalling an expiry. Any in-flight
    /// timer finds no matching generation and stands down.
    pub fn forget(&self, name: &NodeName) {
        self.generations.remove(name);
    }

    /// Whether the node currently has an unexpired deadline.
    pub fn is_tracked(&self, name: &NodeName) -> bool {
        self.generations.contains_key(name)
    }

    /// Number of tracked nodes.
    pub fn tracked(&self) -> usize {
        self.generations.len()
    }
}
