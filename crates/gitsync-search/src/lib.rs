//! # gitsync-search
//!
//! Document store access and query construction for gitsync.
//!
//! Blob and commit documents share one index and are told apart by a
//! top-level `type` field. This crate provides:
//! - [`DocumentStore`]: the write/search capability the engine consumes
//! - [`HttpDocumentStore`]: Elasticsearch REST client
//! - `MemoryDocumentStore` (feature `testing`): in-process store evaluating
//!   the query subset emitted here, for tests and dry runs
//! - Query builders for blob and commit searches (filters, facets,
//!   ordering, highlighting, pagination)
//! - [`SearchService`]: runs queries and projects typed results

pub mod error;
pub mod http;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod query;
pub mod response;
pub mod schema;
pub mod service;
pub mod store;

pub use error::{SearchError, StoreError};
pub use http::HttpDocumentStore;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryDocumentStore;
pub use query::{build_blob_query, build_commit_query, QueryConfig};
pub use response::{
    FacetBucket, Facets, IndexedDocument, QueryResponse, SearchHit, SearchResults,
};
pub use schema::index_settings;
pub use service::SearchService;
pub use store::{DocumentStore, RawAggregation, RawBucket, RawHit, RawHits, RawSearchResponse, RawTotal};
