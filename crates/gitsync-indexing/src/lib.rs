//! # gitsync-indexing
//!
//! Keeps a document index in step with a git repository.
//!
//! ## Components
//! - [`resolve_range`]: validates revisions and handles the null-sha sentinels
//! - [`ContentFilter`]: text and size eligibility, submodule exclusion
//! - [`BlobIndexer`]: diff-based, full-tree and staging-index blob indexing
//! - [`CommitIndexer`]: one document per commit in a range
//! - [`IndexingExecutor`]: batched writes with bounded retry and concurrency
//! - [`SyncEngine`]: session object tying the above together

pub mod blobs;
pub mod commits;
pub mod engine;
pub mod error;
pub mod executor;
pub mod filter;
pub mod report;
pub mod resolver;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use blobs::BlobIndexer;
pub use commits::CommitIndexer;
pub use engine::{SyncConfig, SyncEngine};
pub use error::IndexingError;
pub use executor::{BatchWriter, IndexingExecutor, WriteBatch, WriteOp, WriteOutcome, WriteStats};
pub use filter::{is_submodule_link, ContentFilter};
pub use report::SyncReport;
pub use resolver::resolve_range;
pub use retry::{RetryFailure, RetryPolicy};
