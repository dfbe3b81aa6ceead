use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::event::EventHub;
use crate::widget::{ContentWatcher, WidgetInfo};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    /// `None` when events are disabled; publishing is then skipped and streams are refused
    pub hub: Option<EventHub>,
    /// Turns widget content changes into notifications
    pub watcher: Arc<ContentWatcher>,
    /// Cancelled on server shutdown; every stream runs on a child token
    pub shutdown: CancellationToken,
    pub keepalive_interval: Duration,
}

impl AppState {
    pub fn new(
        hub: Option<EventHub>,
        watcher: Arc<ContentWatcher>,
        shutdown: CancellationToken,
        keepalive_interval: Duration,
    ) -> Self {
        Self {
            hub,
            watcher,
            shutdown,
            keepalive_interval,
        }
    }

    /// Publishes through the hub if there is one
    pub fn publish<T: serde::Serialize>(&self, topic: &str, payload: T) {
        if let Some(hub) = &self.hub {
            hub.publish(topic, payload);
        }
    }

    /// Called after a widget is rendered; notifies when its content changed.
    /// Returns whether a notification went out.
    pub fn widget_rendered(&self, widget: &WidgetInfo, rendered: &str) -> bool {
        self.watcher.observe(widget, rendered)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
