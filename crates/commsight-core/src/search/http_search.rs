//! HTTP client for the hybrid search service

use super::{CommunicationDocument, SearchFilters, SearchResponse, SearchService};
use crate::config::SearchServiceConfig;
use crate::error::{CommsightError, Result};
use crate::index::{ContextualizedChunk, DocumentIndexer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search service client
pub struct HttpSearchClient {
    http_client: reqwest::Client,
    config: SearchServiceConfig,
}

impl HttpSearchClient {
    /// Create from configuration
    pub fn new(config: SearchServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(SearchServiceConfig::default())
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CommsightError::Search(format!(
            "{} failed (HTTP {}): {}",
            what, status, body
        )))
    }
}

#[derive(Serialize)]
struct HybridRequest<'a> {
    query: &'a str,
    limit: usize,
    filters: &'a SearchFilters,
}

#[derive(Deserialize)]
struct DocumentsResponse {
    documents: Vec<CommunicationDocument>,
}

#[derive(Serialize)]
struct IndexRequest<'a> {
    chunks: &'a [ContextualizedChunk],
}

#[derive(Deserialize)]
struct IndexResponse {
    indexed: usize,
}

#[async_trait]
impl SearchService for HttpSearchClient {
    async fn search_hybrid(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<SearchResponse> {
        let url = format!("{}/search/hybrid", self.config.url);
        let req = self.http_client.post(&url).json(&HybridRequest {
            query,
            limit,
            filters,
        });
        let response = Self::check(self.authorize(req).send().await?, "Hybrid search").await?;
        Ok(response.json().await?)
    }

    async fn get_document(&self, id: &str) -> Result<Option<CommunicationDocument>> {
        let url = format!("{}/documents/{}", self.config.url, id);
        let response = self.authorize(self.http_client.get(&url)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, "Document fetch").await?;
        Ok(Some(response.json().await?))
    }

    async fn customer_communications(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<CommunicationDocument>> {
        let url = format!(
            "{}/customers/{}/communications",
            self.config.url, customer_id
        );
        let req = self
            .http_client
            .get(&url)
            .query(&[("limit", limit.to_string())]);
        let response = Self::check(self.authorize(req).send().await?, "Customer fetch").await?;
        let parsed: DocumentsResponse = response.json().await?;
        Ok(parsed.documents)
    }
}

#[async_trait]
impl DocumentIndexer for HttpSearchClient {
    async fn index_chunks(&self, chunks: &[ContextualizedChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let url = format!("{}/index/chunks", self.config.url);
        let req = self.http_client.post(&url).json(&IndexRequest { chunks });
        let response = Self::check(self.authorize(req).send().await?, "Chunk indexing").await?;
        let parsed: IndexResponse = response.json().await?;
        Ok(parsed.indexed)
    }
}
