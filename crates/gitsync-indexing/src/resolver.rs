//! Revision range resolution.
//!
//! Turns user-supplied `from`/`to` revisions into a validated
//! [`RevisionRange`] of full commit shas before anything is written.

use tracing::{debug, info, warn};

use gitsync_git::RepositoryReader;
use gitsync_types::{is_zero_sha, RevisionRange};

use crate::error::IndexingError;

/// Resolve a revision pair.
///
/// - `to` absent: current head.
/// - `to` all zeros: the ref was deleted, nothing to do (`Ok(None)`).
/// - `from` all zeros: a new branch. Bootstrap when `to` is head, otherwise
///   start at the merge base of `to` and head.
/// - Any other revision must resolve to a commit.
///
/// Empty strings count as absent.
pub fn resolve_range(
    reader: &dyn RepositoryReader,
    from_rev: Option<&str>,
    to_rev: Option<&str>,
) -> Result<Option<RevisionRange>, IndexingError> {
    let from_rev = from_rev.map(str::trim).filter(|r| !r.is_empty());
    let to_rev = to_rev.map(str::trim).filter(|r| !r.is_empty());

    let to = match to_rev {
        None => reader.resolve_head()?,
        Some(rev) if is_zero_sha(rev) => {
            debug!("Target revision is the null sha, nothing to index");
            return Ok(None);
        }
        Some(rev) => resolve_commit(reader, rev, "to_rev")?,
    };

    let from = match from_rev {
        None => None,
        Some(rev) if is_zero_sha(rev) => {
            let head = reader.resolve_head()?;
            if to == head {
                None
            } else {
                match reader.merge_base(&to, &head)? {
                    Some(base) => {
                        info!(to = %to, merge_base = %base, "New branch, indexing from merge base");
                        Some(base)
                    }
                    None => {
                        warn!(to = %to, head = %head, "No merge base with head, indexing full history");
                        None
                    }
                }
            }
        }
        Some(rev) => Some(resolve_commit(reader, rev, "from_rev")?),
    };

    Ok(Some(RevisionRange { from, to }))
}

fn resolve_commit(
    reader: &dyn RepositoryReader,
    rev: &str,
    field: &'static str,
) -> Result<String, IndexingError> {
    let invalid = || IndexingError::InvalidRevision {
        field,
        rev: rev.to_string(),
    };
    match reader.lookup(rev) {
        Ok(object) if object.is_commit() => Ok(object.sha),
        Ok(_) => Err(invalid()),
        Err(e) if e.is_not_found() => Err(invalid()),
        Err(e) => Err(e.into()),
    }
}
