// Library crate for the dashboard event server
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod event;
pub mod notify;
pub mod shared;
pub mod stream;
pub mod widget;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use event::{EventHub, HubConfig, Subscription, Topic};
pub use shared::{AppError, AppState};
pub use stream::{stream_events, StreamWriter};

/// Builds the HTTP router serving the event stream
pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
