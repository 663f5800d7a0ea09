//! Retrieval collaborators
//!
//! Provides:
//! - Communication document and filter types shared with the search service
//! - `SearchService` for hybrid (lexical + vector) retrieval
//! - `Reranker` for cross-encoder second-pass scoring
//! - HTTP implementations of both

mod http_reranker;
mod http_search;

pub use http_reranker::HttpReranker;
pub use http_search::HttpSearchClient;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to a communication record and every chunk cut from it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunicationMetadata {
    /// e.g. "email", "call_transcript", "chat"
    pub source_type: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub channel: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub sentiment: Option<String>,
    pub tags: Vec<String>,
    pub outcome: Option<String>,
    pub journey_type: Option<String>,
}

/// A retrievable document as stored in the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: CommunicationMetadata,
}

/// Inclusive date window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Human-readable form used in prompts
    pub fn describe(&self) -> String {
        const FMT: &str = "%b %-d, %Y";
        match (self.start, self.end) {
            (Some(s), Some(e)) => format!("from {} to {}", s.format(FMT), e.format(FMT)),
            (Some(s), None) => format!("since {}", s.format(FMT)),
            (None, Some(e)) => format!("until {}", e.format(FMT)),
            (None, None) => "all time".to_string(),
        }
    }
}

/// Structured retrieval filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sentiments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey_type: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }
}

/// One hybrid-search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub source: CommunicationDocument,
    pub score: f64,
    #[serde(default)]
    pub highlight: Option<Vec<String>>,
}

/// Hybrid-search response, ordered by descending score
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
}

/// Search index collaborator
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Lexical + vector search over indexed communications
    async fn search_hybrid(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<SearchResponse>;

    /// Fetch one document by id
    async fn get_document(&self, id: &str) -> Result<Option<CommunicationDocument>>;

    /// Most recent communications for a customer, newest first
    async fn customer_communications(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<CommunicationDocument>>;
}

/// Document for reranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankDocument {
    pub id: String,
    pub text: String,
}

/// Reranking result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResult {
    pub id: String,
    pub score: f64,
}

/// Cross-encoder rerank collaborator
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score documents against the query; output is sorted best first
    async fn rerank(
        &self,
        query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RerankResult>>;
}
