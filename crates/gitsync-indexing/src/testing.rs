//! In-memory repository reader for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use gitsync_git::{BlobData, CommitInfo, GitError, GitObject, ObjectKind, RepositoryReader, TreeItem};
use gitsync_types::{DeltaOp, Signature, TreeEntry};

pub(crate) struct FakeReader {
    path: PathBuf,
    pub bare: bool,
    head: Option<String>,
    parents: HashMap<String, Option<String>>,
    commits: HashMap<String, CommitInfo>,
    trees: HashMap<String, Vec<TreeItem>>,
    blobs: HashMap<String, Vec<u8>>,
    diffs: HashMap<(String, String), Vec<DeltaOp>>,
    index: Option<Vec<TreeEntry>>,
    /// Oids passed to `read_blob`, in call order
    pub blob_reads: Mutex<Vec<String>>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/srv/git/fake.git"),
            bare: true,
            head: None,
            parents: HashMap::new(),
            commits: HashMap::new(),
            trees: HashMap::new(),
            blobs: HashMap::new(),
            diffs: HashMap::new(),
            index: None,
            blob_reads: Mutex::new(Vec::new()),
        }
    }

    /// Add a commit whose root tree is `tree-{sha}` with `root` as children.
    pub fn add_commit(&mut self, sha: &str, parent: Option<&str>, root: Vec<TreeItem>) {
        let tree = format!("tree-{}", sha);
        self.trees.insert(tree.clone(), root);
        let sig = Signature {
            name: "Test Author".to_string(),
            email: "author@example.com".to_string(),
            time: Utc.timestamp_opt(1_393_495_200 + self.commits.len() as i64, 0).unwrap(),
        };
        self.commits.insert(
            sha.to_string(),
            CommitInfo {
                sha: sha.to_string(),
                author: sig.clone(),
                committer: sig,
                message: format!("Commit {}\n", sha),
                tree,
            },
        );
        self.parents
            .insert(sha.to_string(), parent.map(str::to_string));
    }

    pub fn add_tree(&mut self, oid: &str, items: Vec<TreeItem>) {
        self.trees.insert(oid.to_string(), items);
    }

    /// A bare tree object, for revisions that must not resolve to a commit.
    pub fn add_tree_object(&mut self, oid: &str) {
        self.add_tree(oid, Vec::new());
    }

    pub fn add_blob(&mut self, oid: &str, data: &[u8]) {
        self.blobs.insert(oid.to_string(), data.to_vec());
    }

    pub fn set_head(&mut self, sha: &str) {
        self.head = Some(sha.to_string());
    }

    pub fn set_diff(&mut self, from: &str, to: &str, ops: Vec<DeltaOp>) {
        self.diffs.insert((from.to_string(), to.to_string()), ops);
    }

    pub fn set_index(&mut self, entries: Vec<TreeEntry>) {
        self.bare = false;
        self.index = Some(entries);
    }

    fn ancestors(&self, sha: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(sha.to_string());
        while let Some(c) = current {
            current = self.parents.get(&c).cloned().flatten();
            chain.push(c);
        }
        chain
    }
}

pub(crate) fn blob(name: &str, oid: &str) -> TreeItem {
    TreeItem::Blob(TreeEntry::new(name, oid, 0o100644))
}

pub(crate) fn subtree(name: &str, oid: &str) -> TreeItem {
    TreeItem::Tree {
        name: name.to_string(),
        oid: oid.to_string(),
    }
}

pub(crate) fn submodule(name: &str, oid: &str) -> TreeItem {
    TreeItem::Submodule(TreeEntry::new(name, oid, 0o160000))
}

impl RepositoryReader for FakeReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_bare(&self) -> bool {
        self.bare
    }

    fn resolve_head(&self) -> Result<String, GitError> {
        self.head.clone().ok_or(GitError::NoHead)
    }

    fn lookup(&self, rev: &str) -> Result<GitObject, GitError> {
        if let Some(info) = self.commits.get(rev) {
            return Ok(GitObject {
                sha: rev.to_string(),
                kind: ObjectKind::Commit,
                commit: Some(info.clone()),
            });
        }
        let kind = if self.trees.contains_key(rev) {
            ObjectKind::Tree
        } else if self.blobs.contains_key(rev) {
            ObjectKind::Blob
        } else {
            return Err(GitError::ObjectNotFound(rev.to_string()));
        };
        Ok(GitObject {
            sha: rev.to_string(),
            kind,
            commit: None,
        })
    }

    fn diff(&self, from: &str, to: &str) -> Result<Vec<DeltaOp>, GitError> {
        self.diffs
            .get(&(from.to_string(), to.to_string()))
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(format!("{}..{}", from, to)))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        let of_a: HashSet<String> = self.ancestors(a).into_iter().collect();
        Ok(self.ancestors(b).into_iter().find(|c| of_a.contains(c)))
    }

    fn log_range(&self, from: Option<&str>, to: &str) -> Result<Vec<String>, GitError> {
        let hidden: HashSet<String> = from
            .map(|f| self.ancestors(f).into_iter().collect())
            .unwrap_or_default();
        Ok(self
            .ancestors(to)
            .into_iter()
            .take_while(|c| !hidden.contains(c))
            .collect())
    }

    fn blob_size(&self, oid: &str) -> Result<u64, GitError> {
        self.blobs
            .get(oid)
            .map(|data| data.len() as u64)
            .ok_or_else(|| GitError::ObjectNotFound(oid.to_string()))
    }

    fn read_blob(&self, oid: &str) -> Result<BlobData, GitError> {
        self.blob_reads.lock().unwrap().push(oid.to_string());
        let data = self
            .blobs
            .get(oid)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(oid.to_string()))?;
        Ok(BlobData {
            size: data.len() as u64,
            data,
        })
    }

    fn walk_tree(&self, tree: &str) -> Result<Vec<TreeItem>, GitError> {
        self.trees
            .get(tree)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(tree.to_string()))
    }

    fn index_entries(&self) -> Result<Option<Vec<TreeEntry>>, GitError> {
        Ok(self.index.clone())
    }
}
