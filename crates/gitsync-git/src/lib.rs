//! # gitsync-git
//!
//! Read access to a git repository for the synchronization engine.
//!
//! - [`RepositoryReader`]: the capability the engine consumes (head, lookup,
//!   tree diff, merge base, revision walk, blob and tree reads)
//! - [`GitRepository`]: libgit2-backed implementation
//! - [`ContentClassifier`]: text detection and language naming
//! - [`HeuristicClassifier`]: NUL-byte text check and extension-based languages

pub mod classifier;
pub mod error;
pub mod reader;
pub mod repository;

pub use classifier::{ContentClassifier, HeuristicClassifier, FALLBACK_LANGUAGE};
pub use error::GitError;
pub use reader::{BlobData, CommitInfo, GitObject, ObjectKind, RepositoryReader, TreeItem};
pub use repository::GitRepository;
