//! Search request types.

use serde::{Deserialize, Serialize};

/// Which document kinds a query targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    Blobs,
    Commits,
    #[default]
    Both,
}

impl SearchTarget {
    pub fn includes_blobs(&self) -> bool {
        matches!(self, SearchTarget::Blobs | SearchTarget::Both)
    }

    pub fn includes_commits(&self) -> bool {
        matches!(self, SearchTarget::Commits | SearchTarget::Both)
    }
}

/// Result ordering. Relevance score breaks ties in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
    /// Relevance score descending
    #[default]
    Default,
    /// Index timestamp descending
    RecentlyIndexed,
    /// Index timestamp ascending
    LastIndexed,
}

impl std::str::FromStr for SearchOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "" | "default" => Ok(SearchOrder::Default),
            "recently_indexed" => Ok(SearchOrder::RecentlyIndexed),
            "last_indexed" => Ok(SearchOrder::LastIndexed),
            other => Err(format!("unknown order: {}", other)),
        }
    }
}

/// Markers wrapped around highlighted spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightOptions {
    pub pre_tag: String,
    pub post_tag: String,
}

impl HighlightOptions {
    pub fn new(pre_tag: impl Into<String>, post_tag: impl Into<String>) -> Self {
        Self {
            pre_tag: pre_tag.into(),
            post_tag: post_tag.into(),
        }
    }
}

/// Structured filters and presentation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Restrict to these repository ids (empty = all)
    #[serde(default)]
    pub repository_ids: Vec<String>,
    /// Restrict blobs to these languages (empty = all)
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub order: SearchOrder,
    /// Highlight matches when set
    #[serde(default)]
    pub highlight: Option<HighlightOptions>,
}

/// A free-text query plus structured options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub target: SearchTarget,
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
    pub options: SearchOptions,
}

impl SearchRequest {
    /// Create a request for the first page of 20 results.
    pub fn new(query: impl Into<String>, target: SearchTarget) -> Self {
        Self {
            query: query.into(),
            target,
            page: 1,
            per_page: 20,
            options: SearchOptions::default(),
        }
    }

    /// Set page and page size. Both are clamped to at least 1.
    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_repository(mut self, repository_id: impl Into<String>) -> Self {
        self.options.repository_ids.push(repository_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.options.languages.push(language.into());
        self
    }

    pub fn with_order(mut self, order: SearchOrder) -> Self {
        self.options.order = order;
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightOptions) -> Self {
        self.options.highlight = Some(highlight);
        self
    }

    /// Scope to one repository unless the caller already chose repositories.
    pub fn scoped_to(mut self, repository_id: impl Into<String>) -> Self {
        if self.options.repository_ids.is_empty() {
            self.options.repository_ids.push(repository_id.into());
        }
        self
    }

    /// Offset of the first hit: `per_page * (page - 1)`.
    pub fn offset(&self) -> u64 {
        let page = self.page.max(1) as u64;
        self.per_page.max(1) as u64 * (page - 1)
    }

    /// True when the query text is blank.
    pub fn is_match_all(&self) -> bool {
        self.query.trim().is_empty()
    }
}
