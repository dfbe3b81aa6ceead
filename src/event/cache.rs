use std::collections::HashMap;

use super::events::SerializedEvent;

/// Latest serialized event per cache key, replayed to subscribers on join
#[derive(Debug, Default)]
pub struct RecentEvents {
    entries: HashMap<String, SerializedEvent>,
}

impl RecentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the latest event for `key`, replacing any earlier one
    pub fn remember(&mut self, key: String, event: SerializedEvent) {
        self.entries.insert(key, event);
    }

    /// Point-in-time copy of every cached event, in no particular order
    pub fn snapshot(&self) -> Vec<SerializedEvent> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
