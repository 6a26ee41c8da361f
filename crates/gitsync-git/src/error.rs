//! Repository access error types.

use thiserror::Error;

/// Errors that can occur while reading a repository.
#[derive(Debug, Error)]
pub enum GitError {
    /// libgit2 error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Path does not contain a repository
    #[error("Not a git repository: {0}")]
    NotARepository(String),

    /// HEAD is unborn or detached from any commit
    #[error("Repository has no HEAD commit")]
    NoHead,

    /// Object id or revision does not exist
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Repository handle mutex was poisoned
    #[error("Repository is locked: {0}")]
    Locked(String),
}

impl GitError {
    /// True when the error means "no such object" rather than a read failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            GitError::ObjectNotFound(_) => true,
            GitError::Git(e) => e.code() == git2::ErrorCode::NotFound,
            _ => false,
        }
    }
}
