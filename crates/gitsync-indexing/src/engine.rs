//! Synchronization engine.
//!
//! One [`SyncEngine`] per synchronization session. It owns the repository
//! handle and holds the reader, classifier and store it was built with.

use std::sync::Arc;

use tracing::info;

use gitsync_git::{ContentClassifier, GitRepository, HeuristicClassifier, RepositoryReader};
use gitsync_search::DocumentStore;
use gitsync_types::{RepositoryHandle, RevisionRange, Settings};

use crate::blobs::BlobIndexer;
use crate::commits::CommitIndexer;
use crate::error::IndexingError;
use crate::executor::IndexingExecutor;
use crate::filter::ContentFilter;
use crate::report::SyncReport;
use crate::resolver::resolve_range;
use crate::retry::RetryPolicy;

/// Configuration for a synchronization session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Index receiving both blob and commit documents
    pub index_name: String,
    /// Operations per flushed batch
    pub batch_size: usize,
    /// Writes in flight during a flush
    pub max_concurrent_writes: usize,
    /// Exclusive blob size ceiling in bytes
    pub max_blob_size: u64,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SyncConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            index_name: settings.store.index_name.clone(),
            batch_size: settings.indexing.batch_size,
            max_concurrent_writes: settings.indexing.max_concurrent_writes,
            max_blob_size: settings.indexing.max_blob_size,
            retry: RetryPolicy::from_settings(&settings.indexing),
        }
    }

    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Keeps a document index in step with a repository.
pub struct SyncEngine {
    handle: RepositoryHandle,
    reader: Arc<dyn RepositoryReader>,
    filter: ContentFilter,
    executor: IndexingExecutor,
    batch_size: usize,
}

impl SyncEngine {
    pub fn new(
        handle: RepositoryHandle,
        reader: Arc<dyn RepositoryReader>,
        classifier: Arc<dyn ContentClassifier>,
        store: Arc<dyn DocumentStore>,
        config: SyncConfig,
    ) -> Self {
        let executor = IndexingExecutor::new(
            store,
            config.index_name,
            config.retry,
            config.max_concurrent_writes,
        );
        Self {
            handle,
            reader,
            filter: ContentFilter::new(classifier, config.max_blob_size),
            executor,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Open the configured repository. Fails with
    /// `MissingRepositoryConfiguration` when no path is set.
    pub fn open(settings: &Settings, store: Arc<dyn DocumentStore>) -> Result<Self, IndexingError> {
        let path = settings.repository_path()?;
        let repository_id = settings.repository_id()?;
        let repository = GitRepository::open(&path)?;
        let handle = RepositoryHandle::new(path, repository_id, repository.is_bare());

        info!(
            path = %handle.path.display(),
            repository_id = %handle.repository_id,
            bare = handle.is_bare,
            store = store.name(),
            "Opened repository"
        );

        Ok(Self::new(
            handle,
            Arc::new(repository),
            Arc::new(HeuristicClassifier::new()),
            store,
            SyncConfig::from_settings(settings),
        ))
    }

    pub fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }

    pub fn index_name(&self) -> &str {
        self.executor.index_name()
    }

    /// Validate a revision pair. `None` when `to` is the null sha.
    pub fn resolve(
        &self,
        from_rev: Option<&str>,
        to_rev: Option<&str>,
    ) -> Result<Option<RevisionRange>, IndexingError> {
        resolve_range(self.reader.as_ref(), from_rev, to_rev)
    }

    /// Index blobs, then commits, for a revision pair.
    pub async fn synchronize(
        &self,
        from_rev: Option<&str>,
        to_rev: Option<&str>,
    ) -> Result<SyncReport, IndexingError> {
        match self.resolve(from_rev, to_rev)? {
            Some(range) => self.synchronize_range(&range).await,
            None => {
                info!(repository_id = %self.handle.repository_id, "Ref deleted, nothing to synchronize");
                Ok(SyncReport::new())
            }
        }
    }

    /// Index blobs, then commits, for an already resolved range.
    pub async fn synchronize_range(&self, range: &RevisionRange) -> Result<SyncReport, IndexingError> {
        info!(repository_id = %self.handle.repository_id, range = %range, "Synchronizing");

        let mut report = self.blob_indexer().index_range(range).await?;
        report.merge(&self.commit_indexer().index_range(range).await?);

        info!(
            repository_id = %self.handle.repository_id,
            commits = report.commits_indexed,
            blobs = report.blobs_indexed,
            deleted = report.blobs_deleted,
            skipped = report.skipped,
            failed = report.failed,
            "Synchronization complete"
        );
        Ok(report)
    }

    /// Blob half of [`Self::synchronize`].
    pub async fn index_blobs(
        &self,
        from_rev: Option<&str>,
        to_rev: Option<&str>,
    ) -> Result<SyncReport, IndexingError> {
        match self.resolve(from_rev, to_rev)? {
            Some(range) => self.index_blobs_range(&range).await,
            None => Ok(SyncReport::new()),
        }
    }

    pub async fn index_blobs_range(&self, range: &RevisionRange) -> Result<SyncReport, IndexingError> {
        self.blob_indexer().index_range(range).await
    }

    /// Commit half of [`Self::synchronize`].
    pub async fn index_commits(
        &self,
        from_rev: Option<&str>,
        to_rev: Option<&str>,
    ) -> Result<SyncReport, IndexingError> {
        match self.resolve(from_rev, to_rev)? {
            Some(range) => self.index_commits_range(&range).await,
            None => Ok(SyncReport::new()),
        }
    }

    pub async fn index_commits_range(&self, range: &RevisionRange) -> Result<SyncReport, IndexingError> {
        self.commit_indexer().index_range(range).await
    }

    fn blob_indexer(&self) -> BlobIndexer<'_> {
        BlobIndexer::new(
            self.reader.as_ref(),
            &self.filter,
            &self.executor,
            &self.handle.repository_id,
            self.batch_size,
        )
    }

    fn commit_indexer(&self) -> CommitIndexer<'_> {
        CommitIndexer::new(
            self.reader.as_ref(),
            &self.executor,
            &self.handle.repository_id,
            self.batch_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsync_search::MemoryDocumentStore;
    use gitsync_types::{DeltaOp, TreeEntry, ZERO_SHA};

    use crate::testing::{blob, FakeReader};

    const INDEX: &str = "gitsync-test";

    fn engine(reader: FakeReader) -> (SyncEngine, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let handle = RepositoryHandle::new("/srv/git/fake.git", "1", true);
        let engine = SyncEngine::new(
            handle,
            Arc::new(reader),
            Arc::new(HeuristicClassifier::new()),
            store.clone(),
            SyncConfig::default().with_index_name(INDEX),
        );
        (engine, store)
    }

    /// main: a - b - c (head); feature: b - d - e - f
    fn history() -> FakeReader {
        let mut reader = FakeReader::new();
        reader.add_blob("v1", b"puts 'v1'\n");
        reader.add_blob("v2", b"puts 'v2'\n");
        for (sha, parent) in [
            ("a", None),
            ("b", Some("a")),
            ("c", Some("b")),
            ("d", Some("b")),
            ("e", Some("d")),
            ("f", Some("e")),
        ] {
            reader.add_commit(sha, parent, vec![blob("main.rb", "v1")]);
        }
        reader.set_diff(
            "b",
            "f",
            vec![DeltaOp::Modified(TreeEntry::new("main.rb", "v2", 0o100644))],
        );
        reader.set_head("c");
        reader
    }

    #[tokio::test]
    async fn test_bootstrap_indexes_blobs_and_commits() {
        let (engine, store) = engine(history());
        let report = engine.synchronize(None, None).await.unwrap();

        assert_eq!(report.blobs_indexed, 1);
        assert_eq!(report.commits_indexed, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(store.ids(INDEX), vec!["1_a", "1_b", "1_c", "1_main.rb"]);
    }

    #[tokio::test]
    async fn test_new_branch_indexes_only_branch_commits() {
        let (engine, store) = engine(history());
        let report = engine.index_commits(Some(ZERO_SHA), Some("f")).await.unwrap();

        assert_eq!(report.commits_indexed, 3);
        assert_eq!(store.ids(INDEX), vec!["1_d", "1_e", "1_f"]);
    }

    #[tokio::test]
    async fn test_new_branch_blobs_use_merge_base_diff() {
        let (engine, store) = engine(history());
        let report = engine.index_blobs(Some(ZERO_SHA), Some("f")).await.unwrap();

        assert_eq!(report.blobs_indexed, 1);
        let body = store.get(INDEX, "1_main.rb").unwrap();
        assert_eq!(body["blob"]["oid"], "v2");
        assert_eq!(body["blob"]["commit_sha"], "f");
    }

    #[tokio::test]
    async fn test_invalid_revision_writes_nothing() {
        let (engine, store) = engine(history());
        let err = engine.synchronize(Some("nope"), None).await.unwrap_err();

        assert!(matches!(err, IndexingError::InvalidRevision { .. }));
        assert!(store.is_empty(INDEX));
    }

    #[tokio::test]
    async fn test_deleted_ref_is_noop() {
        let (engine, store) = engine(history());
        let report = engine.synchronize(Some("b"), Some(ZERO_SHA)).await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert!(store.is_empty(INDEX));
    }

    #[tokio::test]
    async fn test_synchronize_twice_is_idempotent() {
        let (engine, store) = engine(history());
        engine.synchronize(None, None).await.unwrap();
        let first: Vec<_> = store
            .ids(INDEX)
            .into_iter()
            .map(|id| {
                let mut body = store.get(INDEX, &id).unwrap();
                body["indexed_at"] = serde_json::Value::Null;
                (id, body)
            })
            .collect();

        engine.synchronize(None, None).await.unwrap();
        let second: Vec<_> = store
            .ids(INDEX)
            .into_iter()
            .map(|id| {
                let mut body = store.get(INDEX, &id).unwrap();
                body["indexed_at"] = serde_json::Value::Null;
                (id, body)
            })
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_open_without_repository_path() {
        let settings = Settings::default();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let err = SyncEngine::open(&settings, store).err().unwrap();
        assert!(matches!(err, IndexingError::MissingRepositoryConfiguration));
    }
}
