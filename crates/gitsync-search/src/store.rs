//! Document store capability.
//!
//! The engine and the search service talk to the index only through
//! [`DocumentStore`]. Query bodies use the Elasticsearch query DSL and
//! responses are decoded into the `Raw*` types below.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Write and search access to a document index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Create or replace the document with this id.
    async fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<(), StoreError>;

    /// Remove a document. Returns `StoreError::NotFound` when it is absent.
    async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError>;

    /// Run a search request body.
    async fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, StoreError>;

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Create an index with the given settings and mappings.
    async fn create_index(&self, index: &str, settings: &Value) -> Result<(), StoreError>;

    async fn delete_index(&self, index: &str) -> Result<(), StoreError>;

    /// Make recent writes visible to search.
    async fn refresh(&self, index: &str) -> Result<(), StoreError>;
}

/// Search response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSearchResponse {
    pub hits: RawHits,
    #[serde(default)]
    pub aggregations: HashMap<String, RawAggregation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHits {
    pub total: RawTotal,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Hit total: an object on 7.x and later, a bare number before that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

impl RawTotal {
    pub fn value(&self) -> u64 {
        match self {
            RawTotal::Count(n) => *n,
            RawTotal::Object { value } => *value,
        }
    }
}

impl Default for RawTotal {
    fn default() -> Self {
        RawTotal::Object { value: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source")]
    pub source: Value,
    /// Highlighted fragments per field
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub highlight: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAggregation {
    #[serde(default)]
    pub buckets: Vec<RawBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBucket {
    /// String for keyword fields, number for numeric ones
    pub key: Value,
    pub doc_count: u64,
}

impl RawBucket {
    pub fn key_string(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
