//! # gitsync-types
//!
//! Shared domain types for gitsync.
//!
//! This crate defines the data model passed between the synchronization
//! engine, the repository reader and the document store:
//! - Repository handles, revision ranges, tree entries and deltas
//! - Blob and commit documents as they are stored in the search index
//! - Search requests and their options
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use gitsync_types::{BlobDocument, RevisionRange};
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod repository;
pub mod search;

pub use config::{IndexingSettings, RepositorySettings, SearchSettings, Settings, StoreSettings};
pub use document::{blob_doc_id, commit_doc_id, BlobDocument, CommitDocument, Signature};
pub use error::GitsyncError;
pub use repository::{
    is_zero_sha, DeltaOp, RepositoryHandle, RevisionRange, TreeEntry, SUBMODULE_MODE, ZERO_SHA,
};
pub use search::{HighlightOptions, SearchOptions, SearchOrder, SearchRequest, SearchTarget};
