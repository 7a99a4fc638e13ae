use std::{collections::HashMap, sync::Arc};

use mongodb::bson::oid::ObjectId;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, warn};

use super::subscribers::{Payload, SubscriberRegistry};
use crate::models::tally_models::TallySnapshot;

/// Handle for queueing tally snapshots for fan-out.
///
/// All snapshots go through one dispatcher task, which feeds each
/// subscriber's FIFO outbox. Snapshots of a poll that are not newer than the
/// last one sent for that poll are dropped, so an observer never sees a
/// poll's tally go backwards even when tallies are computed out of order.
#[derive(Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<TallySnapshot>,
}

impl Broadcaster {
    pub fn spawn(registry: Arc<SubscriberRegistry>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(registry);
        let handle = tokio::spawn(dispatcher.run(rx));
        (Self { tx }, handle)
    }

    /// Queues a snapshot and returns immediately.
    pub fn broadcast(&self, snapshot: TallySnapshot) {
        if self.tx.send(snapshot).is_err() {
            warn!("Broadcast dispatcher has stopped, dropping tally");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub dropped_subscribers: usize,
}

struct Dispatcher {
    registry: Arc<SubscriberRegistry>,
    // Highest total vote count sent so far, per poll.
    high_water: HashMap<ObjectId, u64>,
}

impl Dispatcher {
    fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            high_water: HashMap::new(),
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<TallySnapshot>) {
        while let Some(snapshot) = rx.recv().await {
            self.dispatch(snapshot);
        }
        debug!("Broadcast dispatcher finished");
    }

    /// Returns `None` when the snapshot was stale and skipped.
    fn dispatch(&mut self, snapshot: TallySnapshot) -> Option<DispatchReport> {
        let total = snapshot.total_votes();
        if let Some(&seen) = self.high_water.get(&snapshot.poll_id) {
            if total <= seen {
                debug!(poll = %snapshot.poll_id, total, seen, "Skipping stale tally");
                return None;
            }
        }
        self.high_water.insert(snapshot.poll_id, total);

        let payload: Payload = match serde_json::to_string(&snapshot) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                error!(poll = %snapshot.poll_id, "Failed to serialize tally: {}", e);
                return None;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        self.registry.for_each_live(|subscriber| match subscriber.deliver(&payload) {
            Ok(()) => delivered += 1,
            Err(reason) => failed.push((subscriber.id(), reason)),
        });

        for (id, reason) in &failed {
            warn!(subscriber = %id, ?reason, "Delivery failed, dropping subscriber");
            self.registry.unregister(*id);
        }

        debug!(poll = %snapshot.poll_id, delivered, "Tally broadcast");
        Some(DispatchReport {
            delivered,
            dropped_subscribers: failed.len(),
        })
    }
}
