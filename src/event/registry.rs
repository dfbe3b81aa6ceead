use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use super::events::SerializedEvent;

/// Queue capacity per subscriber
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Identity of one connected subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single non-blocking send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Queue full, message dropped for this subscriber only
    Dropped,
    /// Subscriber is not registered (or its receiver is gone)
    Gone,
}

/// Per-call fan-out counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
}

/// Active subscriber queues
///
/// The registry holds the only sender for each queue, so removing an entry
/// is what closes the queue. Callers guard it with the hub lock.
#[derive(Debug)]
pub struct SubscriberRegistry {
    capacity: usize,
    subscribers: HashMap<SubscriberId, mpsc::Sender<SerializedEvent>>,
}

impl SubscriberRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: HashMap::new(),
        }
    }

    /// Allocates and registers a bounded queue
    pub fn register(&mut self) -> (SubscriberId, mpsc::Receiver<SerializedEvent>) {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriberId::new();
        self.subscribers.insert(id, sender);
        (id, receiver)
    }

    /// Removes a subscriber, dropping its sender. Returns false if it was already gone.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn deliver(&self, id: SubscriberId, message: SerializedEvent) -> Delivery {
        match self.subscribers.get(&id) {
            Some(sender) => try_deliver(sender, message),
            None => Delivery::Gone,
        }
    }

    /// Non-blocking send of `message` to every registered subscriber
    pub fn broadcast(&self, message: &SerializedEvent) -> FanOut {
        let mut fan_out = FanOut::default();
        for (id, sender) in &self.subscribers {
            match try_deliver(sender, message.clone()) {
                Delivery::Delivered => fan_out.delivered += 1,
                Delivery::Dropped => {
                    debug!(subscriber_id = %id, "Subscriber queue full, dropping event");
                    fan_out.dropped += 1;
                }
                Delivery::Gone => {}
            }
        }
        fan_out
    }

    /// Removes every subscriber, closing all queues. Returns how many were removed.
    pub fn drain(&mut self) -> usize {
        let count = self.subscribers.len();
        self.subscribers.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

fn try_deliver(sender: &mpsc::Sender<SerializedEvent>, message: SerializedEvent) -> Delivery {
    match sender.try_send(message) {
        Ok(()) => Delivery::Delivered,
        Err(TrySendError::Full(_)) => Delivery::Dropped,
        Err(TrySendError::Closed(_)) => Delivery::Gone,
    }
}
