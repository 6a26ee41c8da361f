//! Repository-side types: handles, revision ranges, tree entries and deltas.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// All-zero object id used by git hooks for "no such ref".
///
/// As `from` it means a new branch with no prior state. As `to` it means
/// the ref was deleted.
pub const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

/// File mode of a gitlink (nested repository / submodule) entry.
pub const SUBMODULE_MODE: u32 = 0o160000;

/// Check whether a revision string is the all-zero sentinel.
pub fn is_zero_sha(rev: &str) -> bool {
    rev == ZERO_SHA
}

/// Identity of the repository being synchronized.
///
/// Built once per synchronization session and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryHandle {
    /// Filesystem path of the repository (work tree or bare directory)
    pub path: PathBuf,
    /// Caller-assigned id scoping documents inside a shared index
    pub repository_id: String,
    /// Whether the repository has no work tree
    pub is_bare: bool,
}

impl RepositoryHandle {
    /// Create a handle. An empty `repository_id` falls back to the path.
    pub fn new(path: impl Into<PathBuf>, repository_id: impl Into<String>, is_bare: bool) -> Self {
        let path = path.into();
        let mut repository_id = repository_id.into();
        if repository_id.is_empty() {
            repository_id = path.to_string_lossy().to_string();
        }
        Self {
            path,
            repository_id,
            is_bare,
        }
    }
}

/// A validated pair of revisions to synchronize.
///
/// `from = None` means "index everything reachable from `to`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRange {
    /// Prior indexed state, if any
    pub from: Option<String>,
    /// Target commit sha
    pub to: String,
}

impl RevisionRange {
    /// Range covering the whole history reachable from `to`.
    pub fn bootstrap(to: impl Into<String>) -> Self {
        Self {
            from: None,
            to: to.into(),
        }
    }

    /// Range covering changes between two commits.
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
        }
    }

    /// True when there is no prior state.
    pub fn is_bootstrap(&self) -> bool {
        self.from.is_none()
    }
}

impl std::fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.from {
            Some(from) => write!(f, "{}..{}", from, self.to),
            None => write!(f, "{}", self.to),
        }
    }
}

/// A file entry inside a tree or the staging index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Slash-joined path relative to the repository root
    pub path: String,
    /// Object id of the blob (or commit, for submodule links)
    pub oid: String,
    /// Octal git file mode
    pub mode: u32,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, oid: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            oid: oid.into(),
            mode,
        }
    }

    /// Whether this entry points into another repository's object space.
    pub fn is_submodule(&self) -> bool {
        self.mode == SUBMODULE_MODE
    }
}

/// One change between two trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "entry", rename_all = "snake_case")]
pub enum DeltaOp {
    /// Path exists only in the new tree
    Added(TreeEntry),
    /// Path exists in both trees with different content or mode
    Modified(TreeEntry),
    /// Path exists only in the old tree
    Deleted(TreeEntry),
}

impl DeltaOp {
    /// The entry this delta refers to (new side, or old side for deletes).
    pub fn entry(&self) -> &TreeEntry {
        match self {
            DeltaOp::Added(e) | DeltaOp::Modified(e) | DeltaOp::Deleted(e) => e,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, DeltaOp::Deleted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sha() {
        assert!(is_zero_sha(ZERO_SHA));
        assert!(!is_zero_sha("5937ac0a7beb003549fc5fd26fc247adbce4a52e"));
        assert_eq!(ZERO_SHA.len(), 40);
    }

    #[test]
    fn test_handle_defaults_id_to_path() {
        let handle = RepositoryHandle::new("/srv/repos/app.git", "", true);
        assert_eq!(handle.repository_id, "/srv/repos/app.git");

        let handle = RepositoryHandle::new("/srv/repos/app.git", "42", true);
        assert_eq!(handle.repository_id, "42");
    }

    #[test]
    fn test_revision_range_display() {
        assert_eq!(RevisionRange::bootstrap("abc").to_string(), "abc");
        assert_eq!(RevisionRange::between("a", "b").to_string(), "a..b");
        assert!(RevisionRange::bootstrap("abc").is_bootstrap());
    }

    #[test]
    fn test_submodule_entry() {
        let entry = TreeEntry::new("vendor/lib", "abc", 0o160000);
        assert!(entry.is_submodule());
        let entry = TreeEntry::new("src/main.rs", "abc", 0o100644);
        assert!(!entry.is_submodule());
    }

    #[test]
    fn test_delta_entry() {
        let op = DeltaOp::Deleted(TreeEntry::new("a.txt", "1", 0o100644));
        assert!(op.is_delete());
        assert_eq!(op.entry().path, "a.txt");
    }
}
