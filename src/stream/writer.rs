use axum::body::Bytes;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::sink::{FrameSink, StreamError};
use crate::event::{EventHub, SerializedEvent, Subscription};

/// Default idle period before a keep-alive comment is written
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Comment written once when the stream opens
pub const OPEN_FRAME: &[u8] = b": ok\n\n";

/// Comment written after an idle period
pub const PING_FRAME: &[u8] = b": ping\n\n";

/// Encodes one event as an SSE data frame
pub fn data_frame(event: &SerializedEvent) -> Bytes {
    Bytes::from(format!("data: {}\n\n", event))
}

/// Lifecycle of a single stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
    Closed,
}

/// Why a stream ended without a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The connection's cancellation token fired (server shutdown)
    Cancelled,
    /// The peer went away
    PeerClosed,
    /// The hub closed the subscriber queue
    QueueClosed,
}

/// Drives one subscriber from join to leave over a long-lived response stream
pub struct StreamWriter {
    hub: EventHub,
    sink: Box<dyn FrameSink>,
    cancel: CancellationToken,
    keepalive: Duration,
    state: StreamState,
}

impl StreamWriter {
    pub fn new(
        hub: EventHub,
        sink: Box<dyn FrameSink>,
        cancel: CancellationToken,
        keepalive: Duration,
    ) -> Self {
        Self {
            hub,
            sink,
            cancel,
            keepalive,
            state: StreamState::Connecting,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Run the stream until cancellation, peer disconnect, queue closure or a write error.
    ///
    /// The hub subscription is released exactly once on every exit path.
    pub async fn run(mut self) -> Result<CloseReason, StreamError> {
        let mut subscription = match self.hub.join() {
            Ok(subscription) => subscription,
            Err(e) => {
                self.state = StreamState::Closed;
                return Err(e.into());
            }
        };
        self.state = StreamState::Streaming;
        debug!(subscriber_id = %subscription.id(), "Stream opened");

        let result = self.stream(&mut subscription).await;

        self.state = StreamState::Closed;
        info!(
            subscriber_id = %subscription.id(),
            outcome = ?result,
            "Stream closed"
        );
        subscription.leave();
        result
    }

    async fn stream(
        &mut self,
        subscription: &mut Subscription,
    ) -> Result<CloseReason, StreamError> {
        if let Some(reason) = self.send(Bytes::from_static(OPEN_FRAME)).await? {
            return Ok(reason);
        }

        let idle = sleep(self.keepalive);
        tokio::pin!(idle);

        loop {
            let frame = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return Ok(CloseReason::Cancelled),

                _ = self.sink.closed() => return Ok(CloseReason::PeerClosed),

                message = subscription.recv() => match message {
                    Some(event) => data_frame(&event),
                    None => return Ok(CloseReason::QueueClosed),
                },

                _ = &mut idle => {
                    debug!(subscriber_id = %subscription.id(), "Writing keep-alive");
                    Bytes::from_static(PING_FRAME)
                }
            };

            if let Some(reason) = self.send(frame).await? {
                return Ok(reason);
            }
            idle.as_mut().reset(Instant::now() + self.keepalive);
        }
    }

    /// Writes and flushes one frame. A peer that stops reading can stall the
    /// write indefinitely, so cancellation still ends the stream meanwhile.
    async fn send(&mut self, frame: Bytes) -> Result<Option<CloseReason>, StreamError> {
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;

            _ = cancel.cancelled() => Ok(Some(CloseReason::Cancelled)),

            written = self.write(frame) => written.map(|()| None),
        }
    }

    async fn write(&mut self, frame: Bytes) -> Result<(), StreamError> {
        self.sink.write_frame(frame).await?;
        self.sink.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{HubConfig, Topic};
    use crate::stream::ChannelSink;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::task::JoinHandle;

    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<String>>>,
        fail_writes_after: Option<usize>,
        peer_gone: CancellationToken,
    }

    impl RecordingSink {
        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn write_frame(&mut self, frame: Bytes) -> Result<(), StreamError> {
            let mut frames = self.frames.lock().unwrap();
            if self.fail_writes_after == Some(frames.len()) {
                return Err(StreamError::WriteFailed("broken pipe".to_string()));
            }
            frames.push(String::from_utf8(frame.to_vec()).unwrap());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), StreamError> {
            Ok(())
        }

        async fn closed(&self) {
            self.peer_gone.cancelled().await
        }
    }

    struct Harness {
        hub: EventHub,
        sink: RecordingSink,
        cancel: CancellationToken,
        handle: JoinHandle<Result<CloseReason, StreamError>>,
    }

    fn start(sink: RecordingSink) -> Harness {
        let hub = EventHub::new(HubConfig::default());
        let cancel = CancellationToken::new();
        let writer = StreamWriter::new(
            hub.clone(),
            Box::new(sink.clone()),
            cancel.clone(),
            DEFAULT_KEEPALIVE_INTERVAL,
        );
        assert_eq!(writer.state(), StreamState::Connecting);
        let handle = tokio::spawn(writer.run());
        Harness {
            hub,
            sink,
            cancel,
            handle,
        }
    }

    /// Let spawned tasks run until they are all waiting again
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_frame_then_data_frames() {
        let harness = start(RecordingSink::default());
        settle().await;
        assert_eq!(harness.hub.subscriber_count(), 1);

        harness.hub.publish(Topic::PageUpdate, json!({"slug": "home"}));
        harness.hub.publish("rss:new_items", json!({"count": 2}));
        settle().await;

        let frames = harness.sink.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], ": ok\n\n");
        assert!(frames[1].starts_with("data: {"));
        assert!(frames[1].contains("\"type\":\"page:update\""));
        assert!(frames[1].ends_with("}\n\n"));
        assert!(frames[2].contains("\"type\":\"rss:new_items\""));

        harness.cancel.cancel();
        let reason = harness.handle.await.unwrap().unwrap();
        assert_eq!(reason, CloseReason::Cancelled);
        assert_eq!(harness.hub.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_after_idle_period() {
        let harness = start(RecordingSink::default());

        sleep(Duration::from_secs(29)).await;
        assert_eq!(harness.sink.frames(), vec![": ok\n\n"]);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(harness.sink.frames(), vec![": ok\n\n", ": ping\n\n"]);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(harness.sink.frames().len(), 3);

        harness.cancel.cancel();
        harness.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_postpones_keepalive() {
        let harness = start(RecordingSink::default());

        sleep(Duration::from_secs(20)).await;
        harness.hub.publish("rss:new_items", json!({}));
        sleep(Duration::from_secs(20)).await;

        let frames = harness.sink.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|frame| frame != ": ping\n\n"));

        sleep(Duration::from_secs(11)).await;
        assert_eq!(harness.sink.frames().last().unwrap(), ": ping\n\n");

        harness.cancel.cancel();
        harness.handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_error_closes_stream_and_leaves_hub() {
        let sink = RecordingSink {
            fail_writes_after: Some(1),
            ..RecordingSink::default()
        };
        let harness = start(sink);
        settle().await;

        harness.hub.publish("rss:new_items", json!({}));
        let result = harness.handle.await.unwrap();

        assert!(matches!(result, Err(StreamError::WriteFailed(_))));
        assert_eq!(harness.hub.subscriber_count(), 0);
        harness.hub.publish("rss:new_items", json!({}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_disconnect_closes_stream() {
        let harness = start(RecordingSink::default());
        settle().await;

        harness.sink.peer_gone.cancel();

        assert_eq!(
            harness.handle.await.unwrap().unwrap(),
            CloseReason::PeerClosed
        );
        assert_eq!(harness.hub.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hub_shutdown_ends_stream() {
        let harness = start(RecordingSink::default());
        settle().await;

        harness.hub.shutdown();

        assert_eq!(
            harness.handle.await.unwrap().unwrap(),
            CloseReason::QueueClosed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_stream_blocked_on_unread_body() {
        let hub = EventHub::default();
        let cancel = CancellationToken::new();
        let (sink, body) = ChannelSink::with_body();
        let writer = StreamWriter::new(
            hub.clone(),
            Box::new(sink),
            cancel.clone(),
            DEFAULT_KEEPALIVE_INTERVAL,
        );
        let handle = tokio::spawn(writer.run());
        settle().await;

        for n in 0..40 {
            hub.publish("rss:new_items", json!({ "n": n }));
            settle().await;
        }
        assert!(!handle.is_finished());

        cancel.cancel();
        let reason = tokio::time::timeout(Duration::from_secs(60), handle)
            .await
            .expect("writer should stop while a write is pending")
            .unwrap()
            .unwrap();

        assert_eq!(reason, CloseReason::Cancelled);
        assert_eq!(hub.subscriber_count(), 0);
        drop(body);
    }

    #[tokio::test]
    async fn test_join_refused_after_shutdown() {
        let hub = EventHub::default();
        hub.shutdown();
        let sink = RecordingSink::default();
        let writer = StreamWriter::new(
            hub,
            Box::new(sink.clone()),
            CancellationToken::new(),
            DEFAULT_KEEPALIVE_INTERVAL,
        );

        assert!(matches!(writer.run().await, Err(StreamError::Hub(_))));
        assert!(sink.frames().is_empty());
    }
}
