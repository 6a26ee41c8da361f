//! Blob indexing: diff-based, full-tree and working-index enumeration.

use chrono::Utc;
use tracing::{debug, info};

use gitsync_git::{RepositoryReader, TreeItem};
use gitsync_types::{blob_doc_id, BlobDocument, DeltaOp, RevisionRange, TreeEntry};

use crate::error::IndexingError;
use crate::executor::{BatchWriter, IndexingExecutor, WriteOp};
use crate::filter::{is_submodule_link, ContentFilter};
use crate::report::SyncReport;

/// Writes blob documents for one repository.
pub struct BlobIndexer<'a> {
    reader: &'a dyn RepositoryReader,
    filter: &'a ContentFilter,
    executor: &'a IndexingExecutor,
    repository_id: &'a str,
    batch_size: usize,
}

impl<'a> BlobIndexer<'a> {
    pub fn new(
        reader: &'a dyn RepositoryReader,
        filter: &'a ContentFilter,
        executor: &'a IndexingExecutor,
        repository_id: &'a str,
        batch_size: usize,
    ) -> Self {
        Self {
            reader,
            filter,
            executor,
            repository_id,
            batch_size,
        }
    }

    /// Index the blobs a range touches.
    ///
    /// With a `from` revision only the tree diff is applied. A bootstrap of a
    /// non-bare repository at its head reads the staging index; any other
    /// bootstrap walks the tree of `to`.
    pub async fn index_range(&self, range: &RevisionRange) -> Result<SyncReport, IndexingError> {
        if let Some(from) = &range.from {
            return self.index_diff(from, &range.to).await;
        }
        if !self.reader.is_bare() && self.reader.resolve_head()? == range.to {
            return self.index_working_index(&range.to).await;
        }
        self.index_tree(&range.to).await
    }

    /// Apply the net changes between two commits, last delta first.
    pub async fn index_diff(&self, from: &str, to: &str) -> Result<SyncReport, IndexingError> {
        let deltas = self.reader.diff(from, to)?;
        info!(from, to, deltas = deltas.len(), "Indexing blobs from diff");

        let mut report = SyncReport::new();
        let mut writer = BatchWriter::new(self.executor, self.batch_size);

        for delta in deltas.iter().rev() {
            let entry = delta.entry();
            if is_submodule_link(entry) {
                debug!(path = %entry.path, "Skipping submodule link");
                report.record_skip();
                continue;
            }

            match delta {
                DeltaOp::Deleted(entry) => {
                    writer.push(self.delete_op(entry)).await;
                }
                DeltaOp::Added(entry) | DeltaOp::Modified(entry) => {
                    match self.upsert_op(entry, to)? {
                        Some(op) => writer.push(op).await,
                        None => {
                            report.record_skip();
                            // The previous revision of a modified file may be indexed
                            if matches!(delta, DeltaOp::Modified(_)) {
                                writer.push(self.delete_op(entry)).await;
                            }
                        }
                    }
                }
            }
        }

        report.record_blob_writes(&writer.finish().await);
        Ok(report)
    }

    /// Index every blob reachable from the tree of `to`.
    ///
    /// Depth first, a tree's blobs before its subtrees.
    pub async fn index_tree(&self, to: &str) -> Result<SyncReport, IndexingError> {
        let root = self
            .reader
            .lookup(to)?
            .commit
            .map(|c| c.tree)
            .ok_or_else(|| IndexingError::InvalidRevision {
                field: "to_rev",
                rev: to.to_string(),
            })?;
        info!(to, tree = %root, "Indexing full tree");

        let mut report = SyncReport::new();
        let mut writer = BatchWriter::new(self.executor, self.batch_size);
        let mut stack = vec![(String::new(), root)];

        while let Some((prefix, tree)) = stack.pop() {
            let mut subtrees = Vec::new();
            for item in self.reader.walk_tree(&tree)? {
                match item {
                    TreeItem::Blob(entry) => {
                        let entry = TreeEntry {
                            path: format!("{}{}", prefix, entry.path),
                            ..entry
                        };
                        match self.upsert_op(&entry, to)? {
                            Some(op) => writer.push(op).await,
                            None => report.record_skip(),
                        }
                    }
                    TreeItem::Submodule(entry) => {
                        debug!(path = %format!("{}{}", prefix, entry.path), "Skipping submodule link");
                        report.record_skip();
                    }
                    TreeItem::Tree { name, oid } => {
                        subtrees.push((format!("{}{}/", prefix, name), oid));
                    }
                }
            }
            stack.extend(subtrees.into_iter().rev());
        }

        report.record_blob_writes(&writer.finish().await);
        Ok(report)
    }

    /// Index the staging index of a work-tree repository, labelled with `to`.
    /// Falls back to the tree walk when there is no staging index.
    pub async fn index_working_index(&self, to: &str) -> Result<SyncReport, IndexingError> {
        let Some(entries) = self.reader.index_entries()? else {
            return self.index_tree(to).await;
        };
        info!(to, entries = entries.len(), "Indexing staging index");

        let mut report = SyncReport::new();
        let mut writer = BatchWriter::new(self.executor, self.batch_size);
        for entry in &entries {
            if is_submodule_link(entry) {
                debug!(path = %entry.path, "Skipping submodule link");
                report.record_skip();
                continue;
            }
            match self.upsert_op(entry, to)? {
                Some(op) => writer.push(op).await,
                None => report.record_skip(),
            }
        }

        report.record_blob_writes(&writer.finish().await);
        Ok(report)
    }

    fn delete_op(&self, entry: &TreeEntry) -> WriteOp {
        WriteOp::delete(blob_doc_id(self.repository_id, &entry.path))
    }

    /// Read and filter a blob. `None` when the content filter rejects it.
    fn upsert_op(&self, entry: &TreeEntry, commit_sha: &str) -> Result<Option<WriteOp>, IndexingError> {
        let size = self.reader.blob_size(&entry.oid)?;
        if !self.filter.within_size_limit(size) {
            debug!(path = %entry.path, size, "Blob too large");
            return Ok(None);
        }

        let blob = self.reader.read_blob(&entry.oid)?;
        if !self.filter.is_indexable(blob.size, &blob.data) {
            debug!(path = %entry.path, size = blob.size, "Blob not indexable");
            return Ok(None);
        }

        let document = BlobDocument {
            oid: entry.oid.clone(),
            rid: self.repository_id.to_string(),
            language: self.filter.detect_language(&entry.path, &blob.data),
            content: String::from_utf8_lossy(&blob.data).into_owned(),
            commit_sha: commit_sha.to_string(),
            path: entry.path.clone(),
            size: blob.size,
            mode: entry.mode,
        };
        let body = document.to_body(Utc::now())?;
        Ok(Some(WriteOp::upsert(document.doc_id(), body)))
    }
}
