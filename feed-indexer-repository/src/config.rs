//! Configuration types for the search index.

/// Settings applied when the target index has to be created.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Number of primary shards.
    pub number_of_shards: u32,
    /// Number of replicas per shard.
    pub number_of_replicas: u32,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
        }
    }
}

impl SearchIndexConfig {
    /// Create a config with custom shard and replica counts.
    pub fn new(number_of_shards: u32, number_of_replicas: u32) -> Self {
        Self {
            number_of_shards,
            number_of_replicas,
        }
    }
}
