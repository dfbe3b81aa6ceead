use async_trait::async_trait;
use axum::body::{Body, Bytes};
use std::convert::Infallible;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::HubError;

/// Chunks buffered between a writer and the HTTP body
const BODY_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Writable, flushable end of one long-lived response stream
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Write one complete frame
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), StreamError>;

    /// Push buffered frames to the peer
    async fn flush(&mut self) -> Result<(), StreamError>;

    /// Resolves once the peer has gone away
    async fn closed(&self);
}

/// Sink feeding an axum streaming [`Body`] through a bounded channel
///
/// Each frame becomes one body chunk, which hyper writes out as soon as it
/// is polled, so flushing has nothing left to do.
pub struct ChannelSink {
    sender: mpsc::Sender<Result<Bytes, Infallible>>,
}

impl ChannelSink {
    /// Creates a sink together with the response body it writes into
    pub fn with_body() -> (Self, Body) {
        let (sender, receiver) = mpsc::channel(BODY_BUFFER);
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|chunk| (chunk, receiver))
        });
        (Self { sender }, Body::from_stream(stream))
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), StreamError> {
        self.sender
            .send(Ok(frame))
            .await
            .map_err(|_| StreamError::ConnectionClosed)
    }

    async fn flush(&mut self) -> Result<(), StreamError> {
        if self.sender.is_closed() {
            return Err(StreamError::ConnectionClosed);
        }
        Ok(())
    }

    async fn closed(&self) {
        self.sender.closed().await
    }
}
