//! Registry of connected tally observers.
//!
//! Each subscriber owns a bounded outbox. The transport drains the receiving
//! end; the broadcaster only ever `try_send`s into it, so a stalled
//! connection fills its own outbox and is dropped instead of holding up
//! anyone else.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

pub type SubscriberId = Uuid;

/// Serialized tally payload, shared between every outbox it is pushed to.
pub type Payload = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Active,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The outbox is full; the connection is not keeping up.
    Backlogged,
    /// The receiving side of the outbox is gone.
    Disconnected,
    /// The subscriber already left the active state.
    NotLive,
}

struct SubscriberState {
    liveness: Liveness,
    outbox: Option<mpsc::Sender<Payload>>,
}

pub struct Subscriber {
    id: SubscriberId,
    state: Mutex<SubscriberState>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn liveness(&self) -> Liveness {
        self.state.lock().liveness
    }

    /// Pushes a payload without waiting. Any failure moves the subscriber to
    /// `Closing`; the liveness check and the push happen under one lock, so
    /// nothing reaches a subscriber once it has been closed.
    pub fn deliver(&self, payload: &Payload) -> Result<(), DeliveryFailure> {
        let mut state = self.state.lock();

        if state.liveness != Liveness::Active {
            return Err(DeliveryFailure::NotLive);
        }
        let outbox = match state.outbox.as_ref() {
            Some(outbox) => outbox,
            None => return Err(DeliveryFailure::NotLive),
        };

        let failure = match outbox.try_send(payload.clone()) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(_)) => DeliveryFailure::Backlogged,
            Err(TrySendError::Closed(_)) => DeliveryFailure::Disconnected,
        };

        state.liveness = Liveness::Closing;
        Err(failure)
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.liveness = Liveness::Closed;
        // Dropping the sender ends the transport's outbox stream.
        state.outbox = None;
    }
}

/// What a transport gets back when a connection subscribes.
pub struct Registration {
    pub id: SubscriberId,
    pub outbox: mpsc::Receiver<Payload>,
}

/// Tracks live subscribers. Safe to share across connection tasks and the
/// broadcast dispatcher.
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<Subscriber>>,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn register(&self) -> Registration {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();

        self.subscribers.insert(
            id,
            Arc::new(Subscriber {
                id,
                state: Mutex::new(SubscriberState {
                    liveness: Liveness::Active,
                    outbox: Some(tx),
                }),
            }),
        );

        debug!(subscriber = %id, "Subscriber registered");
        Registration { id, outbox: rx }
    }

    /// Closes and removes a subscriber. Returns whether it was still present;
    /// unregistering twice is harmless.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        match self.subscribers.remove(&id) {
            Some((_, subscriber)) => {
                subscriber.close();
                debug!(subscriber = %id, "Subscriber unregistered");
                true
            }
            None => false,
        }
    }

    /// Calls `f` for every subscriber that is active right now.
    ///
    /// Membership is copied out first so `f` runs without holding any map
    /// lock and may itself register or unregister.
    pub fn for_each_live<F>(&self, mut f: F)
    where
        F: FnMut(&Subscriber),
    {
        let live: Vec<Arc<Subscriber>> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().liveness() == Liveness::Active)
            .map(|entry| entry.value().clone())
            .collect();

        for subscriber in &live {
            f(subscriber);
        }
    }

    pub fn liveness(&self, id: SubscriberId) -> Option<Liveness> {
        self.subscribers.get(&id).map(|entry| entry.value().liveness())
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
