// Public API
pub use handler::stream_events;
pub use sink::{ChannelSink, FrameSink, StreamError};
pub use writer::{
    data_frame, CloseReason, StreamState, StreamWriter, DEFAULT_KEEPALIVE_INTERVAL, OPEN_FRAME,
    PING_FRAME,
};

// Internal modules
mod handler;
mod sink;
mod writer;
