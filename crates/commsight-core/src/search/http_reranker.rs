//! HTTP-based reranker using an external cross-encoder service

use super::{RerankDocument, RerankResult, Reranker};
use crate::config::RerankServiceConfig;
use crate::error::{CommsightError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reranker backed by a `POST /rerank` endpoint
pub struct HttpReranker {
    http_client: reqwest::Client,
    config: RerankServiceConfig,
}

impl HttpReranker {
    /// Create from configuration
    pub fn new(config: RerankServiceConfig) -> Result<Self> {
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
        Self::new(RerankServiceConfig::default())
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [RerankDocument],
    top_k: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    reranked_documents: Vec<RerankResult>,
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/rerank", self.config.url);
        let response = self
            .http_client
            .post(&url)
            .json(&RerankRequest {
                query,
                documents,
                top_k,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CommsightError::Rerank(format!(
                "Rerank service error (HTTP {}): {}",
                status, body
            )));
        }

        let parsed: RerankResponse = response.json().await?;
        tracing::debug!(
            "Reranked {} documents, {} returned",
            documents.len(),
            parsed.reranked_documents.len()
        );
        Ok(parsed.reranked_documents)
    }
}
