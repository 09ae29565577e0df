//! OpenSearch index settings.
//!
//! Event payloads are schemaless, so the index relies on dynamic mapping and
//! only the shard layout is set explicitly.

use serde_json::{json, Value};

use crate::config::SearchIndexConfig;

/// Get the create-index body for the target index.
pub fn get_index_settings(config: &SearchIndexConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas
        }
    })
}
