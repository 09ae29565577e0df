//! # Feed Relay
//!
//! Subscribes to a Server-Sent Events feed and forwards every event payload,
//! unmodified, to a Kafka topic.
//!
//! The relay keeps no cursor and no index state. Feed reconnects are handled
//! by [`feed::EventSource`]; produce calls are fire-and-forget enqueues whose
//! delivery reports are observed on detached tasks.

pub mod config;
pub mod errors;
pub mod feed;
pub mod forwarder;
pub mod producer;
pub mod relay;

pub use config::RelaySettings;
pub use errors::RelayError;
pub use forwarder::LogForwarder;
pub use relay::{Relay, RelayHandle};
