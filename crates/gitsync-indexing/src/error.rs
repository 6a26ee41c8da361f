//! Error types for synchronization.

use gitsync_git::GitError;
use gitsync_search::StoreError;
use gitsync_types::GitsyncError;
use thiserror::Error;

/// Errors that abort a synchronization request.
///
/// Per-document write failures never surface here; they are retried,
/// logged and counted in [`crate::SyncReport::failed`].
#[derive(Error, Debug)]
pub enum IndexingError {
    /// A supplied revision does not resolve to a commit
    #[error("Invalid revision for {field}: {rev}")]
    InvalidRevision { field: &'static str, rev: String },

    /// No repository path configured
    #[error("No repository path configured")]
    MissingRepositoryConfiguration,

    /// Reading the repository failed
    #[error("Repository error: {0}")]
    Repository(#[from] GitError),

    /// Store operation outside the per-document write path failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Settings are unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document body could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<GitsyncError> for IndexingError {
    fn from(err: GitsyncError) -> Self {
        match err {
            GitsyncError::MissingRepositoryConfiguration => {
                IndexingError::MissingRepositoryConfiguration
            }
            GitsyncError::Serialization(e) => IndexingError::Serialization(e.to_string()),
            other => IndexingError::Config(other.to_string()),
        }
    }
}
