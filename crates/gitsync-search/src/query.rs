//! Query construction for blob and commit searches.
//!
//! Both builders produce a `bool` query whose `must` clause carries the
//! free text (or `match_all` when it is blank) and whose `filter` clauses
//! pin the document type and any repository or language restriction.

use serde_json::{json, Value};

use gitsync_types::{SearchRequest, SearchOrder, SearchSettings};

/// Commit text fields with their relevance boosts.
pub const COMMIT_FIELDS: [&str; 6] = [
    "commit.message^10",
    "commit.sha^5",
    "commit.author.name^2",
    "commit.author.email^2",
    "commit.committer.name",
    "commit.committer.email",
];

pub const BLOB_CONTENT_FIELD: &str = "blob.content";
pub const COMMIT_MESSAGE_FIELD: &str = "commit.message";

pub const COMMIT_REPOSITORY_FACET: &str = "commitRepositoryFacet";
pub const BLOB_REPOSITORY_FACET: &str = "blobRepositoryFacet";
pub const LANGUAGE_FACET: &str = "languageFacet";

/// Field holding the index timestamp on every document.
pub const INDEXED_AT_FIELD: &str = "indexed_at";

/// Facet sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    pub repositories_count: u32,
    pub languages_count: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self::from(&SearchSettings::default())
    }
}

impl From<&SearchSettings> for QueryConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            repositories_count: settings.repositories_count,
            languages_count: settings.languages_count,
        }
    }
}

/// Search body for commits.
pub fn build_commit_query(request: &SearchRequest, config: &QueryConfig) -> Value {
    let text = request.query.trim();
    let must = if text.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({
            "multi_match": {
                "query": text,
                "fields": COMMIT_FIELDS,
                "operator": "or"
            }
        })
    };

    let mut filter = vec![json!({"term": {"type": "commit"}})];
    if !request.options.repository_ids.is_empty() {
        filter.push(json!({"terms": {"commit.rid": request.options.repository_ids}}));
    }

    let mut body = json!({
        "query": {"bool": {"must": must, "filter": filter}},
        "aggs": {
            COMMIT_REPOSITORY_FACET: {
                "terms": {"field": "commit.rid", "size": config.repositories_count}
            }
        },
        "sort": sort_clause(request),
        "from": request.offset(),
        "size": request.per_page,
        "track_total_hits": true,
    });
    finish(&mut body, request, json!({ COMMIT_MESSAGE_FIELD: {} }));
    body
}

/// Search body for blobs. Every query term must appear in the content.
pub fn build_blob_query(request: &SearchRequest, config: &QueryConfig) -> Value {
    let text = request.query.trim();
    let must = if text.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({
            "match": {
                BLOB_CONTENT_FIELD: {"query": text, "operator": "and"}
            }
        })
    };

    let mut filter = vec![json!({"term": {"type": "blob"}})];
    if !request.options.repository_ids.is_empty() {
        filter.push(json!({"terms": {"blob.rid": request.options.repository_ids}}));
    }
    if !request.options.languages.is_empty() {
        filter.push(json!({"terms": {"blob.language": request.options.languages}}));
    }

    let mut body = json!({
        "query": {"bool": {"must": must, "filter": filter}},
        "aggs": {
            LANGUAGE_FACET: {
                "terms": {"field": "blob.language", "size": config.languages_count}
            },
            BLOB_REPOSITORY_FACET: {
                "terms": {"field": "blob.rid", "size": config.repositories_count}
            }
        },
        "sort": sort_clause(request),
        "from": request.offset(),
        "size": request.per_page,
        "track_total_hits": true,
    });
    finish(
        &mut body,
        request,
        json!({ BLOB_CONTENT_FIELD: {"type": "fvh", "boundary_chars": "\n"} }),
    );
    body
}

/// Score always breaks ties. A blank query has no meaningful score, so
/// the default order falls back to most recently indexed first.
fn sort_clause(request: &SearchRequest) -> Value {
    match (request.options.order, request.is_match_all()) {
        (SearchOrder::Default, false) => json!(["_score"]),
        (SearchOrder::Default, true) | (SearchOrder::RecentlyIndexed, _) => {
            json!([{ INDEXED_AT_FIELD: {"order": "desc"} }, "_score"])
        }
        (SearchOrder::LastIndexed, _) => {
            json!([{ INDEXED_AT_FIELD: {"order": "asc"} }, "_score"])
        }
    }
}

fn finish(body: &mut Value, request: &SearchRequest, highlight_fields: Value) {
    if request.is_match_all() {
        body["track_scores"] = json!(true);
    }
    if let Some(highlight) = &request.options.highlight {
        body["highlight"] = json!({
            "pre_tags": [highlight.pre_tag],
            "post_tags": [highlight.post_tag],
            "fields": highlight_fields,
        });
    }
}
