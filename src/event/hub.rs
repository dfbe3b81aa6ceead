use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::cache::RecentEvents;
use super::debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
use super::events::{EntityId, Event, SerializedEvent, Topic};
use super::registry::{Delivery, SubscriberId, SubscriberRegistry, DEFAULT_QUEUE_CAPACITY};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("Event hub has been shut down")]
    ShutDown,
}

/// Tunables for the event hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Cooldown for debounced topics
    pub debounce_window: Duration,
    /// Capacity of each subscriber queue
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Everything guarded by the hub's single lock
#[derive(Debug)]
struct HubState {
    subscribers: SubscriberRegistry,
    debouncer: Debouncer,
    recent: RecentEvents,
    shut_down: bool,
}

#[derive(Debug)]
struct HubInner {
    state: Mutex<HubState>,
}

/// In-process fan-out of update events to streaming subscribers
///
/// Built once at startup and shared by cloning; every clone talks to the same
/// subscriber set. Producers call [`EventHub::publish`], stream handlers call
/// [`EventHub::join`]. [`EventHub::shutdown`] closes every queue.
///
/// The lock is only held for non-blocking work and never across an `.await`.
#[derive(Debug, Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new(config: HubConfig) -> Self {
        info!(
            debounce_window_secs = config.debounce_window.as_secs_f64(),
            queue_capacity = config.queue_capacity,
            "Creating event hub"
        );

        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState {
                    subscribers: SubscriberRegistry::new(config.queue_capacity),
                    debouncer: Debouncer::new(config.debounce_window),
                    recent: RecentEvents::new(),
                    shut_down: false,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock()
    }

    /// Publishes an event to every subscriber.
    ///
    /// Debounced topics drop repeats for the same widget inside the cooldown.
    /// Cacheable topics also become the latest state replayed to new subscribers.
    /// Never fails: problems are logged and the event is abandoned.
    pub fn publish<T>(&self, topic: impl Into<Topic>, payload: T)
    where
        T: Serialize,
    {
        let topic = topic.into();

        let data = match serde_json::to_value(&payload) {
            Ok(data) => data,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to encode event payload");
                return;
            }
        };

        if topic.is_debounced() {
            let entity = EntityId::from_payload(&data);
            let mut state = self.state();
            if state.shut_down {
                return;
            }
            if !state.debouncer.should_emit(&topic, entity, Instant::now()) {
                return;
            }
        }

        let serialized = match Event::now(&topic, &data).to_serialized() {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to serialize event");
                return;
            }
        };
        let cache_key = topic.cache_key(&data);

        let mut state = self.state();
        if state.shut_down {
            return;
        }
        if let Some(key) = cache_key {
            state.recent.remember(key, serialized.clone());
        }

        if state.subscribers.is_empty() {
            debug!(topic = %topic, "Publishing event with no subscribers");
            return;
        }

        let fan_out = state.subscribers.broadcast(&serialized);
        debug!(
            topic = %topic,
            delivered = fan_out.delivered,
            dropped = fan_out.dropped,
            "Event published"
        );
    }

    /// Registers a new subscriber and replays the recent-event cache into it
    #[instrument(skip(self))]
    pub fn join(&self) -> Result<Subscription, HubError> {
        let (id, receiver, recent) = {
            let mut state = self.state();
            if state.shut_down {
                return Err(HubError::ShutDown);
            }
            let (id, receiver) = state.subscribers.register();
            let recent = state.recent.snapshot();
            info!(
                subscriber_id = %id,
                subscribers = state.subscribers.len(),
                "Subscriber joined"
            );
            (id, receiver, recent)
        };

        HubInner::spawn_replay(&self.inner, id, recent);

        Ok(Subscription {
            id,
            receiver,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Sends a message to a single subscriber without blocking
    pub fn deliver(&self, id: SubscriberId, message: SerializedEvent) -> Delivery {
        self.state().subscribers.deliver(id, message)
    }

    /// Closes every subscriber queue and refuses further joins and publishes
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.shut_down = true;
        let closed = state.subscribers.drain();
        info!(closed, "Event hub shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.state().shut_down
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    pub fn cached_event_count(&self) -> usize {
        self.state().recent.len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl HubInner {
    fn lock(&self) -> MutexGuard<'_, HubState> {
        // Critical sections never panic midway, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replays cached events into a freshly joined queue on a background task.
    ///
    /// Goes through the registry under the lock, so a subscriber that left or
    /// was shut down before the task ran gets nothing. Items that do not fit
    /// are dropped.
    fn spawn_replay(inner: &Arc<Self>, id: SubscriberId, events: Vec<SerializedEvent>) {
        if events.is_empty() {
            return;
        }

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let total = events.len();
            let state = inner.lock();
            let replayed = events
                .into_iter()
                .map(|event| state.subscribers.deliver(id, event))
                .filter(|delivery| *delivery == Delivery::Delivered)
                .count();
            debug!(subscriber_id = %id, replayed, total, "Replayed recent events");
        });
    }

    fn leave(&self, id: SubscriberId) {
        let mut state = self.lock();
        if state.subscribers.remove(id) {
            info!(
                subscriber_id = %id,
                subscribers = state.subscribers.len(),
                "Subscriber left"
            );
        }
    }
}

/// One subscriber's membership in the hub
///
/// Owns the receiving end of the subscriber queue. Leaving happens exactly
/// once, either through [`Subscription::leave`] or when the handle is dropped.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<SerializedEvent>,
    inner: Arc<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event. `None` once the hub has closed the queue.
    pub async fn recv(&mut self) -> Option<SerializedEvent> {
        self.receiver.recv().await
    }

    /// Takes an already queued event without waiting
    pub fn try_recv(&mut self) -> Option<SerializedEvent> {
        self.receiver.try_recv().ok()
    }

    /// Removes this subscriber from the hub and closes its queue
    pub fn leave(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.leave(self.id);
    }
}
