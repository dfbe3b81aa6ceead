// Event distribution components
//
// Producers publish into the hub; the hub debounces noisy topics, remembers the
// latest state per widget or page, and fans out to every subscriber queue.

// Public API - what other modules can use
pub use cache::RecentEvents;
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use events::{EntityId, Event, SerializedEvent, Topic};
pub use hub::{EventHub, HubConfig, HubError, Subscription};
pub use registry::{Delivery, FanOut, SubscriberId, SubscriberRegistry, DEFAULT_QUEUE_CAPACITY};

// Internal modules
mod cache;
mod debounce;
mod events;
mod hub;
mod registry;
