//! Content eligibility.

use std::sync::Arc;

use gitsync_git::ContentClassifier;
use gitsync_types::{TreeEntry, SUBMODULE_MODE};

/// Decides which blobs get indexed.
#[derive(Clone)]
pub struct ContentFilter {
    classifier: Arc<dyn ContentClassifier>,
    max_blob_size: u64,
}

impl ContentFilter {
    pub fn new(classifier: Arc<dyn ContentClassifier>, max_blob_size: u64) -> Self {
        Self {
            classifier,
            max_blob_size,
        }
    }

    /// Whether a blob of `size` bytes is under the ceiling. Checked before
    /// the content is loaded.
    pub fn within_size_limit(&self, size: u64) -> bool {
        size < self.max_blob_size
    }

    /// Text content strictly smaller than the size ceiling.
    pub fn is_indexable(&self, size: u64, data: &[u8]) -> bool {
        size < self.max_blob_size && self.classifier.is_probably_text(data)
    }

    pub fn detect_language(&self, path: &str, data: &[u8]) -> String {
        self.classifier.detect_language(path, data)
    }

    pub fn max_blob_size(&self) -> u64 {
        self.max_blob_size
    }
}

/// Gitlink entries point into another repository and are never indexed or deleted.
pub fn is_submodule_link(entry: &TreeEntry) -> bool {
    entry.mode == SUBMODULE_MODE
}
