//! Assertion helpers for events received by subscribers
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;

use dashpulse::Subscription;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Decoded wire event
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event_type: String,
    pub time: i64,
    pub data: Value,
}

impl ReceivedEvent {
    pub fn parse(raw: &str) -> Self {
        let value: Value = serde_json::from_str(raw).expect("event should be valid JSON");
        Self {
            event_type: value["type"]
                .as_str()
                .expect("event should have a string type")
                .to_string(),
            time: value["time"].as_i64().expect("event should have a unix time"),
            data: value["data"].clone(),
        }
    }
}

pub struct EventAssertion<'a> {
    subscription: &'a mut Subscription,
}

impl<'a> EventAssertion<'a> {
    pub fn for_subscriber(subscription: &'a mut Subscription) -> Self {
        Self { subscription }
    }

    /// Takes everything currently queued, without waiting
    pub fn drain(self) -> Vec<ReceivedEvent> {
        let mut events = Vec::new();
        while let Some(raw) = self.subscription.try_recv() {
            events.push(ReceivedEvent::parse(&raw));
        }
        events
    }

    /// Waits for the next event and checks its type
    pub async fn received_event_type(self, expected_type: &str) -> ReceivedEvent {
        let raw = tokio::time::timeout(std::time::Duration::from_secs(5), self.subscription.recv())
            .await
            .expect("subscriber should receive an event in time")
            .expect("subscriber queue should still be open");
        let event = ReceivedEvent::parse(&raw);
        assert_eq!(event.event_type, expected_type, "received wrong event type");
        event
    }

    /// Asserts nothing is queued right now
    pub fn received_nothing(self) {
        let events = self.drain();
        assert!(events.is_empty(), "expected no events, got {:?}", events);
    }
}
