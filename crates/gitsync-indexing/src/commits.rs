//! Commit indexing.

use chrono::Utc;
use tracing::{debug, info};

use gitsync_git::{CommitInfo, RepositoryReader};
use gitsync_types::{CommitDocument, RevisionRange};

use crate::error::IndexingError;
use crate::executor::{BatchWriter, IndexingExecutor, WriteOp};
use crate::report::SyncReport;

/// Writes commit documents for one repository.
pub struct CommitIndexer<'a> {
    reader: &'a dyn RepositoryReader,
    executor: &'a IndexingExecutor,
    repository_id: &'a str,
    batch_size: usize,
}

impl<'a> CommitIndexer<'a> {
    pub fn new(
        reader: &'a dyn RepositoryReader,
        executor: &'a IndexingExecutor,
        repository_id: &'a str,
        batch_size: usize,
    ) -> Self {
        Self {
            reader,
            executor,
            repository_id,
            batch_size,
        }
    }

    /// Index every commit in `from..to`, or everything reachable from `to`
    /// on bootstrap. `commits_indexed` counts the documents written.
    pub async fn index_range(&self, range: &RevisionRange) -> Result<SyncReport, IndexingError> {
        let shas = self.reader.log_range(range.from.as_deref(), &range.to)?;
        info!(range = %range, commits = shas.len(), "Indexing commits");

        let mut report = SyncReport::new();
        let mut writer = BatchWriter::new(self.executor, self.batch_size);

        for sha in &shas {
            let Some(info) = self.reader.lookup(sha)?.commit else {
                debug!(sha = %sha, "Revision walk yielded a non-commit, skipping");
                report.record_skip();
                continue;
            };
            let document = commit_document(self.repository_id, info);
            let body = document.to_body(Utc::now())?;
            writer.push(WriteOp::upsert(document.doc_id(), body)).await;
        }

        report.record_commit_writes(&writer.finish().await);
        Ok(report)
    }
}

fn commit_document(repository_id: &str, info: CommitInfo) -> CommitDocument {
    CommitDocument {
        rid: repository_id.to_string(),
        sha: info.sha,
        author: info.author,
        committer: info.committer,
        message: info.message,
    }
}
