//! Typed search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gitsync_types::{BlobDocument, CommitDocument};

use crate::error::SearchError;
use crate::query::{
    BLOB_CONTENT_FIELD, BLOB_REPOSITORY_FACET, COMMIT_MESSAGE_FIELD, COMMIT_REPOSITORY_FACET,
    LANGUAGE_FACET,
};
use crate::store::{RawAggregation, RawSearchResponse};

/// A stored document decoded from a hit's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexedDocument {
    Blob(BlobDocument),
    Commit(CommitDocument),
}

impl IndexedDocument {
    /// Decode `{"type": .., "blob"|"commit": {..}}`.
    pub fn from_source(source: &Value) -> Result<Self, SearchError> {
        let kind = source
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::Response("hit without type".to_string()))?;
        let payload = source
            .get(kind)
            .ok_or_else(|| SearchError::Response(format!("hit without {} payload", kind)))?;

        match kind {
            "blob" => serde_json::from_value(payload.clone())
                .map(IndexedDocument::Blob)
                .map_err(|e| SearchError::Response(e.to_string())),
            "commit" => serde_json::from_value(payload.clone())
                .map(IndexedDocument::Commit)
                .map_err(|e| SearchError::Response(e.to_string())),
            other => Err(SearchError::Response(format!("unknown document type {}", other))),
        }
    }

    pub fn repository_id(&self) -> &str {
        match self {
            IndexedDocument::Blob(b) => &b.rid,
            IndexedDocument::Commit(c) => &c.rid,
        }
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Absent when the store did not compute scores
    pub score: Option<f64>,
    pub document: IndexedDocument,
    /// Highlighted fragments, empty unless highlighting was requested
    #[serde(default)]
    pub highlight: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub key: String,
    pub count: u64,
}

/// Facet counts over the whole match set, not just the returned page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub repositories: Vec<FacetBucket>,
    /// Blob searches only
    pub languages: Vec<FacetBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total_count: u64,
    pub facets: Facets,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub(crate) fn from_blob_response(raw: RawSearchResponse) -> Result<Self, SearchError> {
        let facets = Facets {
            repositories: buckets(raw.aggregations.get(BLOB_REPOSITORY_FACET)),
            languages: buckets(raw.aggregations.get(LANGUAGE_FACET)),
        };
        Self::project(raw, facets, BLOB_CONTENT_FIELD)
    }

    pub(crate) fn from_commit_response(raw: RawSearchResponse) -> Result<Self, SearchError> {
        let facets = Facets {
            repositories: buckets(raw.aggregations.get(COMMIT_REPOSITORY_FACET)),
            languages: Vec::new(),
        };
        Self::project(raw, facets, COMMIT_MESSAGE_FIELD)
    }

    fn project(
        raw: RawSearchResponse,
        facets: Facets,
        highlight_field: &str,
    ) -> Result<Self, SearchError> {
        let total_count = raw.hits.total.value();
        let hits = raw
            .hits
            .hits
            .into_iter()
            .map(|mut hit| {
                Ok(SearchHit {
                    document: IndexedDocument::from_source(&hit.source)?,
                    highlight: hit.highlight.remove(highlight_field).unwrap_or_default(),
                    id: hit.id,
                    score: hit.score,
                })
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        Ok(Self {
            hits,
            total_count,
            facets,
        })
    }
}

fn buckets(aggregation: Option<&RawAggregation>) -> Vec<FacetBucket> {
    aggregation
        .map(|agg| {
            agg.buckets
                .iter()
                .map(|b| FacetBucket {
                    key: b.key_string(),
                    count: b.doc_count,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Results per target; a side is `None` when the request excluded it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub blobs: Option<SearchResults>,
    pub commits: Option<SearchResults>,
}
