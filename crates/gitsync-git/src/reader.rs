//! Repository reader trait.
//!
//! Defines the read operations the synchronization engine needs from a
//! version-control object store. All object ids are full hex strings.

use std::path::Path;

use gitsync_types::{DeltaOp, Signature, TreeEntry};

use crate::error::GitError;

/// Kind of object a revision resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
    Unknown,
}

/// Commit metadata as read from the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub author: Signature,
    pub committer: Signature,
    /// Decoded message, invalid UTF-8 replaced
    pub message: String,
    /// Root tree id
    pub tree: String,
}

/// Result of looking up a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitObject {
    /// Full object id the revision resolved to
    pub sha: String,
    pub kind: ObjectKind,
    /// Present when `kind` is `Commit`
    pub commit: Option<CommitInfo>,
}

impl GitObject {
    pub fn is_commit(&self) -> bool {
        self.kind == ObjectKind::Commit
    }
}

/// Raw blob bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobData {
    pub data: Vec<u8>,
    pub size: u64,
}

/// One direct child of a tree.
///
/// Paths of `Blob` and `Submodule` entries hold the entry name only; callers
/// join it with the prefix they accumulated while descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    Blob(TreeEntry),
    Tree { name: String, oid: String },
    Submodule(TreeEntry),
}

/// Read access to a repository.
///
/// Implementations must be shareable across tasks; the engine holds them
/// behind `Arc<dyn RepositoryReader>`.
pub trait RepositoryReader: Send + Sync {
    /// Filesystem location of the repository.
    fn path(&self) -> &Path;

    /// Whether the repository has no work tree.
    fn is_bare(&self) -> bool;

    /// Commit sha the current HEAD points at.
    fn resolve_head(&self) -> Result<String, GitError>;

    /// Resolve a revision (full or abbreviated sha, ref name) to an object.
    fn lookup(&self, rev: &str) -> Result<GitObject, GitError>;

    /// Tree diff between two commits, in the diff engine's natural order.
    fn diff(&self, from: &str, to: &str) -> Result<Vec<DeltaOp>, GitError>;

    /// Lowest common ancestor of two commits, if their histories meet.
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError>;

    /// Commits reachable from `to` but not from `from` (`from..to`),
    /// or everything reachable from `to` when `from` is `None`.
    fn log_range(&self, from: Option<&str>, to: &str) -> Result<Vec<String>, GitError>;

    /// Size in bytes of a blob, read from the object header only.
    fn blob_size(&self, oid: &str) -> Result<u64, GitError>;

    /// Read a blob's content.
    fn read_blob(&self, oid: &str) -> Result<BlobData, GitError>;

    /// Direct children of a tree.
    fn walk_tree(&self, tree: &str) -> Result<Vec<TreeItem>, GitError>;

    /// Entries of the staging index, or `None` for bare repositories.
    fn index_entries(&self) -> Result<Option<Vec<TreeEntry>>, GitError>;
}
