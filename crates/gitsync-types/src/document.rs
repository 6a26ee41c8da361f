//! Documents written to the search index.
//!
//! Stored bodies carry a top-level `type` discriminator and an `indexed_at`
//! stamp (epoch milliseconds) next to the payload, which sits under a
//! `blob` or `commit` key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GitsyncError;

/// Document id of a blob: stable across revisions so upserts overwrite.
///
/// Blob and commit ids share one namespace without a type prefix, so a file
/// whose path is exactly a commit sha maps to that commit's id. Writing or
/// deleting the blob then replaces or removes the commit document.
pub fn blob_doc_id(repository_id: &str, path: &str) -> String {
    format!("{}_{}", repository_id, path)
}

/// Document id of a commit.
pub fn commit_doc_id(repository_id: &str, sha: &str) -> String {
    format!("{}_{}", repository_id, sha)
}

/// An indexed file at the revision it was last synchronized to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDocument {
    /// Blob object id
    pub oid: String,
    /// Repository id
    pub rid: String,
    /// Decoded text, invalid UTF-8 replaced
    pub content: String,
    /// The `to` revision at index time
    pub commit_sha: String,
    /// Root-relative path
    pub path: String,
    /// Classifier language name, or "Text"
    pub language: String,
    /// Size in bytes of the raw blob
    pub size: u64,
    /// Octal file mode
    pub mode: u32,
}

impl BlobDocument {
    pub fn doc_id(&self) -> String {
        blob_doc_id(&self.rid, &self.path)
    }

    /// Body as stored in the index.
    pub fn to_body(&self, indexed_at: DateTime<Utc>) -> Result<Value, GitsyncError> {
        Ok(json!({
            "type": "blob",
            "indexed_at": indexed_at.timestamp_millis(),
            "blob": serde_json::to_value(self)?,
        }))
    }
}

/// Name, email and time of a commit author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: DateTime<Utc>,
}

/// An indexed commit. Immutable once the commit exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDocument {
    /// Repository id
    pub rid: String,
    pub sha: String,
    pub author: Signature,
    pub committer: Signature,
    /// Decoded message, invalid UTF-8 replaced
    pub message: String,
}

impl CommitDocument {
    pub fn doc_id(&self) -> String {
        commit_doc_id(&self.rid, &self.sha)
    }

    /// Body as stored in the index.
    pub fn to_body(&self, indexed_at: DateTime<Utc>) -> Result<Value, GitsyncError> {
        Ok(json!({
            "type": "commit",
            "indexed_at": indexed_at.timestamp_millis(),
            "commit": serde_json::to_value(self)?,
        }))
    }
}
