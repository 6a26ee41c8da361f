//! Query execution over a document store.

use std::sync::Arc;

use tracing::{debug, info};

use gitsync_types::{SearchRequest, Settings};

use crate::error::{SearchError, StoreError};
use crate::query::{build_blob_query, build_commit_query, QueryConfig};
use crate::response::{QueryResponse, SearchResults};
use crate::schema::index_settings;
use crate::store::DocumentStore;

/// Runs blob and commit searches against one index.
#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    index_name: String,
    config: QueryConfig,
}

impl SearchService {
    pub fn new(store: Arc<dyn DocumentStore>, index_name: impl Into<String>, config: QueryConfig) -> Self {
        Self {
            store,
            index_name: index_name.into(),
            config,
        }
    }

    pub fn from_settings(store: Arc<dyn DocumentStore>, settings: &Settings) -> Self {
        Self::new(
            store,
            settings.store.index_name.clone(),
            QueryConfig::from(&settings.search),
        )
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Search every target the request names.
    pub async fn query(&self, request: &SearchRequest) -> Result<QueryResponse, SearchError> {
        let blobs = if request.target.includes_blobs() {
            Some(self.search_blobs(request).await?)
        } else {
            None
        };
        let commits = if request.target.includes_commits() {
            Some(self.search_commits(request).await?)
        } else {
            None
        };
        Ok(QueryResponse { blobs, commits })
    }

    pub async fn search_blobs(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let body = build_blob_query(request, &self.config);
        debug!(body = %body, "Blob search request");
        let raw = self.store.search(&self.index_name, &body).await?;
        let results = SearchResults::from_blob_response(raw)?;

        info!(
            query = %request.query,
            total = results.total_count,
            returned = results.hits.len(),
            "Blob search complete"
        );
        Ok(results)
    }

    pub async fn search_commits(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let body = build_commit_query(request, &self.config);
        debug!(body = %body, "Commit search request");
        let raw = self.store.search(&self.index_name, &body).await?;
        let results = SearchResults::from_commit_response(raw)?;

        info!(
            query = %request.query,
            total = results.total_count,
            returned = results.hits.len(),
            "Commit search complete"
        );
        Ok(results)
    }

    /// Create the index if it is missing. With `force`, drop and recreate it.
    /// Returns true when an index was created.
    pub async fn ensure_index(&self, force: bool) -> Result<bool, SearchError> {
        let exists = self.store.index_exists(&self.index_name).await?;
        if exists && !force {
            debug!(index = %self.index_name, "Index already exists");
            return Ok(false);
        }
        if exists {
            match self.store.delete_index(&self.index_name).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            info!(index = %self.index_name, "Dropped index for recreation");
        }
        self.store
            .create_index(&self.index_name, &index_settings())
            .await?;
        Ok(true)
    }

    /// Make all acknowledged writes searchable.
    pub async fn refresh(&self) -> Result<(), SearchError> {
        self.store.refresh(&self.index_name).await?;
        Ok(())
    }
}
