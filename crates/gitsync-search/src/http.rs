//! Elasticsearch REST document store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info};

use gitsync_types::StoreSettings;

use crate::error::StoreError;
use crate::store::{DocumentStore, RawSearchResponse};

/// Document store backed by an Elasticsearch-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base: Url,
}

impl HttpDocumentStore {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base = Url::parse(url).map_err(|e| StoreError::InvalidUrl(format!("{}: {}", url, e)))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;

        info!(url = %base, "Created document store client");
        Ok(Self { client, base })
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        Self::new(&settings.url, settings.timeout())
    }

    /// Base URL joined with percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Map non-success statuses to errors. `what` names the missing thing on 404.
    async fn check(response: Response, what: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(what.to_string()));
        }
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable(body));
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<(), StoreError> {
        let url = self.url(&[index, "_doc", id])?;
        let response = self.client.put(url).json(body).send().await?;
        Self::check(response, id).await?;
        debug!(index, id, "Upserted document");
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError> {
        let url = self.url(&[index, "_doc", id])?;
        let response = self.client.delete(url).send().await?;
        Self::check(response, id).await?;
        debug!(index, id, "Deleted document");
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, StoreError> {
        let url = self.url(&[index, "_search"])?;
        let response = self.client.post(url).json(body).send().await?;
        let response = Self::check(response, index).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let url = self.url(&[index])?;
        let response = self.client.head(url).send().await?;
        match Self::check(response, index).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<(), StoreError> {
        let url = self.url(&[index])?;
        let response = self.client.put(url).json(settings).send().await?;
        Self::check(response, index).await?;
        info!(index, "Created index");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), StoreError> {
        let url = self.url(&[index])?;
        let response = self.client.delete(url).send().await?;
        Self::check(response, index).await?;
        info!(index, "Deleted index");
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let url = self.url(&[index, "_refresh"])?;
        let response = self.client.post(url).send().await?;
        Self::check(response, index).await?;
        Ok(())
    }
}
