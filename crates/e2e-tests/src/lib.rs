//! End-to-end test infrastructure for gitsync.
//!
//! Provides a [`TestRepo`] that builds real git repositories from
//! in-memory snapshots, and helpers to run a sync against an in-memory
//! document store and read back what was written.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use git2::{IndexEntry, IndexTime, Oid, Repository, Signature, Time};
use rand::Rng;
use serde_json::Value;

use gitsync_indexing::{SyncEngine, SyncReport};
use gitsync_search::{MemoryDocumentStore, SearchService};
use gitsync_types::Settings;

pub const INDEX_NAME: &str = "gitsync-repository";
pub const REPOSITORY_ID: &str = "1";

/// Gitlink mode of a submodule entry.
const GITLINK_MODE: u32 = 0o160000;
const FILE_MODE: u32 = 0o100644;

#[derive(Debug, Clone)]
enum SnapshotEntry {
    File(Vec<u8>),
    Submodule(String),
}

/// Full contents of a commit's tree, keyed by root-relative path.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries
            .insert(path.to_string(), SnapshotEntry::File(content.into()));
        self
    }

    pub fn with_submodule(mut self, path: &str, commit: &str) -> Self {
        self.entries
            .insert(path.to_string(), SnapshotEntry::Submodule(commit.to_string()));
        self
    }

    pub fn without(mut self, path: &str) -> Self {
        self.entries.remove(path);
        self
    }
}

/// A throwaway repository.
pub struct TestRepo {
    /// Keeps temp dir alive for the lifetime of the repository
    pub _temp_dir: tempfile::TempDir,
    pub repo: Repository,
    clock: i64,
}

impl TestRepo {
    /// Repository with a work tree. Commits on the head branch also
    /// update the staging index.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init(temp_dir.path()).expect("Failed to init repository");
        Self::wrap(temp_dir, repo)
    }

    pub fn bare() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init_bare(temp_dir.path()).expect("Failed to init repository");
        Self::wrap(temp_dir, repo)
    }

    fn wrap(temp_dir: tempfile::TempDir, repo: Repository) -> Self {
        repo.set_head("refs/heads/master")
            .expect("Failed to point HEAD at master");
        Self {
            _temp_dir: temp_dir,
            repo,
            clock: 1_500_000_000,
        }
    }

    pub fn path(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Commit `snapshot` on `branch` with the branch tip as parent.
    pub fn commit(&mut self, branch: &str, snapshot: &Snapshot, message: &str) -> String {
        let refname = format!("refs/heads/{}", branch);
        let parent = self
            .repo
            .find_reference(&refname)
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        self.commit_on(&refname, parent.map(|c| c.id()), snapshot, message)
    }

    /// Commit `snapshot` on `branch`, branching off `parent`.
    pub fn commit_from(
        &mut self,
        branch: &str,
        parent: &str,
        snapshot: &Snapshot,
        message: &str,
    ) -> String {
        let refname = format!("refs/heads/{}", branch);
        let parent = Oid::from_str(parent).expect("Invalid parent sha");
        self.commit_on(&refname, Some(parent), snapshot, message)
    }

    fn commit_on(
        &mut self,
        refname: &str,
        parent: Option<Oid>,
        snapshot: &Snapshot,
        message: &str,
    ) -> String {
        let mut index = self.build_index(snapshot);
        let tree_id = index
            .write_tree_to(&self.repo)
            .expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        self.clock += 60;
        let signature = Signature::new(
            "Job van der Voort",
            "job@gitlab.com",
            &Time::new(self.clock, 0),
        )
        .expect("Failed to build signature");

        let parent = parent.map(|id| self.repo.find_commit(id).expect("Missing parent commit"));
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parents)
            .expect("Failed to commit");
        self.repo
            .reference(refname, oid, true, message)
            .expect("Failed to update branch");

        if !self.repo.is_bare() && self.head_ref().as_deref() == Some(refname) {
            let mut staging = self.repo.index().expect("Failed to open index");
            staging.read_tree(&tree).expect("Failed to read tree");
            staging.write().expect("Failed to write index");
        }
        oid.to_string()
    }

    /// Stage a file without committing it.
    pub fn stage(&self, path: &str, content: &[u8]) {
        let oid = self.repo.blob(content).expect("Failed to write blob");
        let mut staging = self.repo.index().expect("Failed to open index");
        staging
            .add(&index_entry(path, oid, FILE_MODE, content.len()))
            .expect("Failed to stage");
        staging.write().expect("Failed to write index");
    }

    fn head_ref(&self) -> Option<String> {
        let head = self.repo.find_reference("HEAD").ok()?;
        head.symbolic_target().map(str::to_string)
    }

    fn build_index(&self, snapshot: &Snapshot) -> git2::Index {
        let mut index = git2::Index::new().expect("Failed to create index");
        for (path, item) in &snapshot.entries {
            let entry = match item {
                SnapshotEntry::File(content) => {
                    let oid = self.repo.blob(content).expect("Failed to write blob");
                    index_entry(path, oid, FILE_MODE, content.len())
                }
                SnapshotEntry::Submodule(commit) => {
                    let oid = Oid::from_str(commit).expect("Invalid submodule sha");
                    index_entry(path, oid, GITLINK_MODE, 0)
                }
            };
            index.add(&entry).expect("Failed to add index entry");
        }
        index
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn index_entry(path: &str, id: Oid, mode: u32, size: usize) -> IndexEntry {
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode,
        uid: 0,
        gid: 0,
        file_size: size as u32,
        id,
        flags: path.len().min(0xfff) as u16,
        flags_extended: 0,
        path: path.as_bytes().to_vec(),
    }
}

/// Settings pointing at `repo` with fast retries.
pub fn settings_for(repo: &TestRepo) -> Settings {
    let mut settings = Settings::default();
    settings.repository.path = Some(repo.path().to_string_lossy().to_string());
    settings.repository.id = Some(REPOSITORY_ID.to_string());
    settings.indexing.initial_backoff_ms = 1;
    settings.indexing.max_backoff_ms = 5;
    settings
}

/// Create the index and run one synchronization.
pub async fn sync(
    repo: &TestRepo,
    store: &Arc<MemoryDocumentStore>,
    from: Option<&str>,
    to: Option<&str>,
) -> SyncReport {
    let settings = settings_for(repo);
    let service = SearchService::from_settings(store.clone(), &settings);
    service
        .ensure_index(false)
        .await
        .expect("Failed to create index");
    let engine = SyncEngine::open(&settings, store.clone()).expect("Failed to open repository");
    engine
        .synchronize(from, to)
        .await
        .expect("Synchronization failed")
}

/// Stored documents with the volatile `indexed_at` stamp removed.
pub fn stored_documents(store: &MemoryDocumentStore) -> BTreeMap<String, Value> {
    store
        .ids(INDEX_NAME)
        .into_iter()
        .filter_map(|id| {
            let mut body = store.get(INDEX_NAME, &id)?;
            if let Some(map) = body.as_object_mut() {
                map.remove("indexed_at");
            }
            Some((id, body))
        })
        .collect()
}

/// Stored blob documents by path, without `commit_sha`, which records the
/// revision a blob was last written at rather than its content.
pub fn stored_blobs(store: &MemoryDocumentStore) -> BTreeMap<String, Value> {
    stored_documents(store)
        .into_values()
        .filter(|body| body["type"] == "blob")
        .filter_map(|body| {
            let mut blob = body.get("blob")?.clone();
            let path = blob["path"].as_str()?.to_string();
            if let Some(map) = blob.as_object_mut() {
                map.remove("commit_sha");
            }
            Some((path, blob))
        })
        .collect()
}

/// Random printable text of `len` bytes.
pub fn random_text(len: usize) -> Vec<u8> {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789 \n";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
        .collect()
}

/// Random bytes of `len` with at least one NUL near the start.
pub fn random_binary(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut data: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    if let Some(byte) = data.get_mut(16) {
        *byte = 0;
    }
    data
}
