// Transport module: chunked delivery over a notification channel

pub mod chunked;

pub use chunked::{
    chunk_plan, ChunkedTransport, SendReport, TransportConfig, TransportError, CHUNK_SIZE,
    DEFAULT_PACING, MAX_NOTIFICATION_SIZE,
};
