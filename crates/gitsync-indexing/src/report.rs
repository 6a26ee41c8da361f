//! Outcome counters for a synchronization run.

use serde::{Deserialize, Serialize};

use crate::executor::WriteStats;

/// Counts of what a run wrote, skipped and gave up on.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Commit documents written
    pub commits_indexed: usize,
    /// Blob documents written
    pub blobs_indexed: usize,
    /// Blob documents removed (or already absent)
    pub blobs_deleted: usize,
    /// Entries dropped by the content filter or as submodule links
    pub skipped: usize,
    /// Writes abandoned after retries
    pub failed: usize,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a filtered entry.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Fold a flushed blob batch into the counters.
    pub fn record_blob_writes(&mut self, stats: &WriteStats) {
        self.blobs_indexed += stats.upserted;
        self.blobs_deleted += stats.deleted;
        self.failed += stats.failed;
    }

    /// Fold a flushed commit batch into the counters.
    pub fn record_commit_writes(&mut self, stats: &WriteStats) {
        self.commits_indexed += stats.upserted;
        self.failed += stats.failed;
    }

    pub fn merge(&mut self, other: &SyncReport) {
        self.commits_indexed += other.commits_indexed;
        self.blobs_indexed += other.blobs_indexed;
        self.blobs_deleted += other.blobs_deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Documents successfully written or removed.
    pub fn processed(&self) -> usize {
        self.commits_indexed + self.blobs_indexed + self.blobs_deleted
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_writes() {
        let mut report = SyncReport::new();
        report.record_blob_writes(&WriteStats {
            upserted: 3,
            deleted: 1,
            failed: 1,
        });
        report.record_commit_writes(&WriteStats {
            upserted: 2,
            deleted: 0,
            failed: 0,
        });
        report.record_skip();

        assert_eq!(report.blobs_indexed, 3);
        assert_eq!(report.blobs_deleted, 1);
        assert_eq!(report.commits_indexed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed(), 6);
        assert!(report.has_failures());
    }

    #[test]
    fn test_merge() {
        let mut a = SyncReport {
            commits_indexed: 1,
            blobs_indexed: 4,
            blobs_deleted: 0,
            skipped: 2,
            failed: 0,
        };
        let b = SyncReport {
            commits_indexed: 3,
            blobs_indexed: 0,
            blobs_deleted: 1,
            skipped: 0,
            failed: 1,
        };
        a.merge(&b);
        assert_eq!(a.commits_indexed, 4);
        assert_eq!(a.blobs_indexed, 4);
        assert_eq!(a.blobs_deleted, 1);
        assert_eq!(a.skipped, 2);
        assert_eq!(a.failed, 1);
    }
}
