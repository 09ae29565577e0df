//! Configuration and dependency wiring for the feed indexer.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::IndexerSettings;
