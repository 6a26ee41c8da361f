//! libgit2-backed repository reader.
//!
//! The handle is wrapped in a Mutex so the reader can be shared across
//! tasks; every operation holds the lock only for its own duration.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use git2::{Delta, ErrorCode, ObjectType, Oid, Repository, Sort};
use tracing::{debug, info};

use gitsync_types::{DeltaOp, Signature, TreeEntry};

use crate::error::GitError;
use crate::reader::{
    BlobData, CommitInfo, GitObject, ObjectKind, RepositoryReader, TreeItem,
};

/// Repository reader over a local git repository.
pub struct GitRepository {
    repo: Mutex<Repository>,
    path: PathBuf,
    bare: bool,
}

impl GitRepository {
    /// Open a repository (bare or with a work tree) at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::NotARepository(path.display().to_string())
            } else {
                GitError::Git(e)
            }
        })?;
        let bare = repo.is_bare();
        info!(path = %path.display(), bare, "Opened repository");

        Ok(Self {
            repo: Mutex::new(repo),
            path: path.to_path_buf(),
            bare,
        })
    }

    fn repo(&self) -> Result<MutexGuard<'_, Repository>, GitError> {
        self.repo
            .lock()
            .map_err(|e| GitError::Locked(e.to_string()))
    }
}

fn parse_oid(oid: &str) -> Result<Oid, GitError> {
    Oid::from_str(oid).map_err(|_| GitError::ObjectNotFound(oid.to_string()))
}

fn object_kind(kind: Option<ObjectType>) -> ObjectKind {
    match kind {
        Some(ObjectType::Commit) => ObjectKind::Commit,
        Some(ObjectType::Tree) => ObjectKind::Tree,
        Some(ObjectType::Blob) => ObjectKind::Blob,
        Some(ObjectType::Tag) => ObjectKind::Tag,
        _ => ObjectKind::Unknown,
    }
}

fn signature(sig: &git2::Signature<'_>) -> Signature {
    let time = DateTime::<Utc>::from_timestamp(sig.when().seconds(), 0).unwrap_or_default();
    Signature {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        time,
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    CommitInfo {
        sha: commit.id().to_string(),
        author: signature(&commit.author()),
        committer: signature(&commit.committer()),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        tree: commit.tree_id().to_string(),
    }
}

fn diff_entry(file: &git2::DiffFile<'_>) -> Option<TreeEntry> {
    let path = file.path()?;
    Some(TreeEntry {
        path: path.to_string_lossy().into_owned(),
        oid: file.id().to_string(),
        mode: u32::from(file.mode()),
    })
}

impl RepositoryReader for GitRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_bare(&self) -> bool {
        self.bare
    }

    fn resolve_head(&self) -> Result<String, GitError> {
        let repo = self.repo()?;
        let head = repo.head().map_err(|e| match e.code() {
            ErrorCode::UnbornBranch | ErrorCode::NotFound => GitError::NoHead,
            _ => GitError::Git(e),
        })?;
        let commit = head.peel_to_commit().map_err(|_| GitError::NoHead)?;
        Ok(commit.id().to_string())
    }

    fn lookup(&self, rev: &str) -> Result<GitObject, GitError> {
        let repo = self.repo()?;
        let object = repo.revparse_single(rev).map_err(|e| {
            if matches!(
                e.code(),
                ErrorCode::NotFound | ErrorCode::Ambiguous | ErrorCode::InvalidSpec
            ) {
                GitError::ObjectNotFound(rev.to_string())
            } else {
                GitError::Git(e)
            }
        })?;
        let kind = object_kind(object.kind());
        let commit = object.as_commit().map(commit_info);

        Ok(GitObject {
            sha: object.id().to_string(),
            kind,
            commit,
        })
    }

    fn diff(&self, from: &str, to: &str) -> Result<Vec<DeltaOp>, GitError> {
        let repo = self.repo()?;
        let old_tree = repo.find_commit(parse_oid(from)?)?.tree()?;
        let new_tree = repo.find_commit(parse_oid(to)?)?.tree()?;
        let diff = repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;

        let mut ops = Vec::new();
        for delta in diff.deltas() {
            let old = diff_entry(&delta.old_file());
            let new = diff_entry(&delta.new_file());
            match (delta.status(), old, new) {
                (Delta::Added | Delta::Copied, _, Some(new)) => ops.push(DeltaOp::Added(new)),
                (Delta::Deleted, Some(old), _) => ops.push(DeltaOp::Deleted(old)),
                (Delta::Modified, _, Some(new)) => ops.push(DeltaOp::Modified(new)),
                (Delta::Renamed, Some(old), Some(new)) => {
                    ops.push(DeltaOp::Deleted(old));
                    ops.push(DeltaOp::Added(new));
                }
                // A path that turned into a gitlink no longer has indexable
                // content; any other type change is a content change.
                (Delta::Typechange, Some(old), Some(new)) => {
                    if new.is_submodule() {
                        ops.push(DeltaOp::Deleted(old));
                    } else {
                        ops.push(DeltaOp::Modified(new));
                    }
                }
                (status, _, _) => debug!(?status, "Ignoring delta"),
            }
        }

        debug!(from, to, deltas = ops.len(), "Computed tree diff");
        Ok(ops)
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        let repo = self.repo()?;
        match repo.merge_base(parse_oid(a)?, parse_oid(b)?) {
            Ok(oid) => Ok(Some(oid.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Git(e)),
        }
    }

    fn log_range(&self, from: Option<&str>, to: &str) -> Result<Vec<String>, GitError> {
        let repo = self.repo()?;
        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(parse_oid(to)?)?;
        if let Some(from) = from {
            walk.hide(parse_oid(from)?)?;
        }

        let mut shas = Vec::new();
        for oid in walk {
            shas.push(oid?.to_string());
        }
        Ok(shas)
    }

    fn blob_size(&self, oid: &str) -> Result<u64, GitError> {
        let repo = self.repo()?;
        let (size, _) = repo.odb()?.read_header(parse_oid(oid)?)?;
        Ok(size as u64)
    }

    fn read_blob(&self, oid: &str) -> Result<BlobData, GitError> {
        let repo = self.repo()?;
        let blob = repo.find_blob(parse_oid(oid)?)?;
        Ok(BlobData {
            data: blob.content().to_vec(),
            size: blob.size() as u64,
        })
    }

    fn walk_tree(&self, tree: &str) -> Result<Vec<TreeItem>, GitError> {
        let repo = self.repo()?;
        let tree = repo.find_tree(parse_oid(tree)?)?;

        let mut items = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let name = String::from_utf8_lossy(entry.name_bytes()).into_owned();
            let oid = entry.id().to_string();
            let mode = entry.filemode() as u32;
            match entry.kind() {
                Some(ObjectType::Blob) => items.push(TreeItem::Blob(TreeEntry::new(name, oid, mode))),
                Some(ObjectType::Tree) => items.push(TreeItem::Tree { name, oid }),
                Some(ObjectType::Commit) => {
                    items.push(TreeItem::Submodule(TreeEntry::new(name, oid, mode)))
                }
                _ => debug!(name = %name, "Skipping unknown tree entry"),
            }
        }
        Ok(items)
    }

    fn index_entries(&self) -> Result<Option<Vec<TreeEntry>>, GitError> {
        if self.bare {
            return Ok(None);
        }
        let repo = self.repo()?;
        let index = repo.index()?;
        let entries = index
            .iter()
            .map(|entry| TreeEntry {
                path: String::from_utf8_lossy(&entry.path).into_owned(),
                oid: entry.id.to_string(),
                mode: entry.mode,
            })
            .collect();
        Ok(Some(entries))
    }
}
