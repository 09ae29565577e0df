//! Processor module for the feed indexer pipeline.
//!
//! Derives document identities from log messages.

mod document_processor;

pub use document_processor::{
    extract_identity, DocumentProcessor, ProcessedRecord, RecordPosition, SkipReason,
};
