//! Server-Sent Events feed client.

mod event_source;
mod handler;
mod sse;

pub use event_source::{EventSource, ReconnectPolicy};
pub use handler::FeedHandler;
pub use sse::SseDecoder;
