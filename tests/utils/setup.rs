//! Hub test fixtures - a hub plus a group of joined subscribers
#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use dashpulse::{
    notify::{NoopNotifier, NotificationPolicy},
    stream::DEFAULT_KEEPALIVE_INTERVAL,
    widget::ContentWatcher,
    AppState, EventHub, HubConfig, Subscription,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct HubSetup {
    pub hub: EventHub,
    pub subscribers: Vec<Subscription>,
}

impl HubSetup {
    /// Join one more subscriber after the setup was built
    pub fn join(&mut self) -> usize {
        self.subscribers
            .push(self.hub.join().expect("hub should accept subscribers"));
        self.subscribers.len() - 1
    }
}

pub struct HubSetupBuilder {
    subscriber_count: usize,
    config: HubConfig,
}

impl HubSetupBuilder {
    pub fn new() -> Self {
        Self {
            subscriber_count: 0,
            config: HubConfig::default(),
        }
    }

    pub fn with_subscribers(mut self, count: usize) -> Self {
        self.subscriber_count = count;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.config.debounce_window = window;
        self
    }

    pub fn build(self) -> HubSetup {
        let hub = EventHub::new(self.config);
        let subscribers = (0..self.subscriber_count)
            .map(|_| hub.join().expect("hub should accept subscribers"))
            .collect();
        HubSetup { hub, subscribers }
    }
}

// ============================================================================
// App State Infrastructure
// ============================================================================

/// Builds the router state the way the binary does, with overridable parts
pub struct AppStateBuilder {
    hub: Option<EventHub>,
    shutdown: CancellationToken,
    keepalive_interval: Duration,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            hub: None,
            shutdown: CancellationToken::new(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }

    pub fn with_hub(mut self, hub: EventHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn build(self) -> AppState {
        let watcher = ContentWatcher::new(
            Arc::new(NoopNotifier),
            NotificationPolicy::from_pairs(Vec::<(String, String)>::new()),
        );
        AppState::new(
            self.hub,
            Arc::new(watcher),
            self.shutdown,
            self.keepalive_interval,
        )
    }
}
