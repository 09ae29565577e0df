//! Response types for search index operations.

use serde_json::Value;

use crate::errors::SearchIndexError;

/// Outcome of a single document upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertResponse {
    /// The document id assigned by the search engine.
    pub id: String,
    /// `created` or `updated`.
    pub result: Option<String>,
    /// Document version after the write.
    pub version: Option<i64>,
}

impl UpsertResponse {
    /// Parse the body of an index API response.
    pub fn from_json(body: &Value) -> Result<Self, SearchIndexError> {
        let id = body
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchIndexError::parse("index response has no _id"))?;

        Ok(Self {
            id: id.to_string(),
            result: body.get("result").and_then(Value::as_str).map(str::to_string),
            version: body.get("_version").and_then(Value::as_i64),
        })
    }
}
