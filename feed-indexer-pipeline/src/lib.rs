//! # Feed Indexer Pipeline
//!
//! This crate provides the pipeline components for consuming feed events
//! from Kafka and upserting them into OpenSearch.
//!
//! ## Architecture
//!
//! The pipeline follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Polls batches of messages from Kafka and commits cursors
//! 2. **Processor**: Derives a stable document id from each payload
//! 3. **Loader**: Upserts documents into OpenSearch
//! 4. **Orchestrator**: Runs poll, index and commit as one sequential cycle
//!
//! A cursor is committed only after every message it covers has been
//! indexed, so a crash at any point replays rather than loses messages.

pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

#[cfg(test)]
mod testing;

pub use errors::PipelineError;
