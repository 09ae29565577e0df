//! # Feed Indexer Shared
//!
//! Types shared between the feed relay and the batch indexer: the raw feed
//! event, the log message that wraps it once it is on the topic, the
//! per-partition cursor, and the document identity used for upserts. Also
//! holds the settings helpers and tracing setup both binaries use.

mod cursor;
mod document;
mod event;
mod settings;
pub mod telemetry;

pub use cursor::{commit_positions, CursorPosition};
pub use document::DocumentId;
pub use event::{FeedEvent, LogMessage};
pub use settings::{parse_var, InvalidSetting, LogFormat};
