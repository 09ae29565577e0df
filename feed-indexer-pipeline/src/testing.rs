//! In-memory log and index doubles for pipeline tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{value::RawValue, Value};

use crate::consumer::LogConsumer;
use crate::errors::PipelineError;
use feed_indexer_repository::{SearchIndexError, SearchIndexProvider, UpsertResponse};
use feed_indexer_shared::{CursorPosition, DocumentId, LogMessage};

/// Operations observed by the doubles, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Upsert(String),
    Commit(Vec<CursorPosition>),
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Op>>>);

impl Journal {
    fn record(&self, op: Op) {
        self.0.lock().unwrap().push(op);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.lock().unwrap().clone()
    }
}

/// Search index keeping documents in memory.
#[derive(Default)]
pub struct MemoryIndex {
    indices: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    failures: Mutex<HashMap<String, (usize, SearchIndexError)>>,
    create_failure: Mutex<Option<SearchIndexError>>,
    upserts: AtomicUsize,
    creates: AtomicUsize,
    journal: Journal,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Make the next `times` upserts of `id` fail with `error`.
    pub fn fail_next(&self, id: &str, times: usize, error: SearchIndexError) {
        self.failures
            .lock()
            .unwrap()
            .insert(id.to_string(), (times, error));
    }

    pub fn fail_create(&self, error: SearchIndexError) {
        *self.create_failure.lock().unwrap() = Some(error);
    }

    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.documents(index).get(id).cloned()
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.documents(index).len()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndexProvider for MemoryIndex {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.indices.lock().unwrap().contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<(), SearchIndexError> {
        if let Some(error) = self.create_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    async fn upsert_document(
        &self,
        index: &str,
        id: &DocumentId,
        body: &RawValue,
    ) -> Result<UpsertResponse, SearchIndexError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some((remaining, error)) = failures.get_mut(id.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(error.clone());
                }
            }
        }

        let value: Value = serde_json::from_str(body.get())
            .map_err(|e| SearchIndexError::validation(e.to_string()))?;
        let previous = self
            .indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), value);
        self.journal.record(Op::Upsert(id.to_string()));

        Ok(UpsertResponse {
            id: id.to_string(),
            result: Some(if previous.is_some() { "updated" } else { "created" }.to_string()),
            version: None,
        })
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(true)
    }
}

#[derive(Default)]
struct LogState {
    partitions: BTreeMap<(String, i32), Vec<LogMessage>>,
    committed: HashMap<(String, i32), i64>,
}

/// A durable log shared by every consumer created from it.
///
/// Committed offsets live in the log, read positions live in each consumer,
/// so dropping a consumer and creating a new one models a process restart.
#[derive(Clone, Default)]
pub struct MemoryLog {
    state: Arc<Mutex<LogState>>,
    journal: Journal,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Append a payload and return its offset.
    pub fn append(&self, topic: &str, partition: i32, payload: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let log = state
            .partitions
            .entry((topic.to_string(), partition))
            .or_default();
        let offset = log.len() as i64;
        log.push(LogMessage::new(topic, partition, offset, payload));
        offset
    }

    pub fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .committed
            .get(&(topic.to_string(), partition))
            .copied()
    }

    pub fn consumer(&self, max_batch_size: usize) -> MemoryConsumer {
        MemoryConsumer {
            log: self.clone(),
            positions: Mutex::new(HashMap::new()),
            max_batch_size,
            fail_commit: AtomicBool::new(false),
        }
    }
}

pub struct MemoryConsumer {
    log: MemoryLog,
    positions: Mutex<HashMap<(String, i32), i64>>,
    max_batch_size: usize,
    fail_commit: AtomicBool,
}

impl MemoryConsumer {
    pub fn fail_commits(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogConsumer for MemoryConsumer {
    fn subscribe(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<LogMessage>, PipelineError> {
        let batch = {
            let state = self.log.state.lock().unwrap();
            let mut positions = self.positions.lock().unwrap();
            let mut batch = Vec::new();

            for (key, messages) in &state.partitions {
                let position = positions
                    .entry(key.clone())
                    .or_insert_with(|| state.committed.get(key).copied().unwrap_or(0));

                while batch.len() < self.max_batch_size {
                    match messages.get(*position as usize) {
                        Some(msg) => {
                            batch.push(msg.clone());
                            *position += 1;
                        }
                        None => break,
                    }
                }
            }
            batch
        };

        if batch.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        Ok(batch)
    }

    async fn commit(&self, positions: &[CursorPosition]) -> Result<(), PipelineError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(PipelineError::commit("broker unavailable"));
        }

        let mut state = self.log.state.lock().unwrap();
        for position in positions {
            state
                .committed
                .insert((position.topic.clone(), position.partition), position.offset);
        }
        self.log.journal.record(Op::Commit(positions.to_vec()));
        Ok(())
    }

    async fn rewind(&self, positions: &[CursorPosition]) -> Result<(), PipelineError> {
        let mut current = self.positions.lock().unwrap();
        for position in positions {
            current.insert((position.topic.clone(), position.partition), position.offset);
        }
        Ok(())
    }
}
