use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::events::{EntityId, Topic};

/// Default cooldown between two accepted events for the same entity
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// Suppresses repeated events for the same `(topic, entity)` within a cooldown window
///
/// Entries are only ever overwritten, so the map grows with the number of
/// distinct entities seen. That set is bounded by the configured widgets.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_emitted: HashMap<(Topic, EntityId), Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: HashMap::new(),
        }
    }

    /// Returns whether an event should go out, recording `now` when it does.
    ///
    /// Topics outside the debounced set and events without an entity id always pass.
    pub fn should_emit(&mut self, topic: &Topic, entity: Option<EntityId>, now: Instant) -> bool {
        if !topic.is_debounced() {
            return true;
        }
        let Some(entity) = entity else {
            return true;
        };

        let key = (topic.clone(), entity);
        if let Some(last) = self.last_emitted.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                debug!(topic = %topic, entity_id = %entity, "Event debounced");
                return false;
            }
        }

        self.last_emitted.insert(key, now);
        true
    }

    /// Number of entities with a recorded emission
    pub fn tracked_entities(&self) -> usize {
        self.last_emitted.len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
