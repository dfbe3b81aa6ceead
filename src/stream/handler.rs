use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::sink::ChannelSink;
use super::writer::StreamWriter;
use crate::shared::{AppError, AppState};

/// Server-sent event stream of hub events
/// GET /events
///
/// The request is expected to be authorized by the layers in front of it.
pub async fn stream_events(State(app_state): State<AppState>) -> Result<Response, AppError> {
    let hub = app_state
        .hub
        .clone()
        .filter(|hub| !hub.is_shut_down())
        .ok_or_else(|| {
            warn!("Event stream requested but the event hub is not available");
            AppError::Unavailable("events not available".to_string())
        })?;

    let (sink, body) = ChannelSink::with_body();
    let writer = StreamWriter::new(
        hub,
        Box::new(sink),
        app_state.shutdown.child_token(),
        app_state.keepalive_interval,
    );

    tokio::spawn(async move {
        match writer.run().await {
            Ok(reason) => {
                info!(reason = ?reason, "Event stream ended");
            }
            Err(e) => {
                warn!(error = %e, "Event stream failed");
            }
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}
