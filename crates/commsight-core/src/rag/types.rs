//! Request and response shapes for RAG queries

use crate::search::{CommunicationDocument, DateRange, SearchFilters};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// One RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub filters: SearchFilters,
    /// Overrides `filters.date_range` when set
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default = "default_true")]
    pub enhance_query: bool,
    #[serde(default)]
    pub use_reranking: bool,
    #[serde(default)]
    pub rerank_top_k: Option<usize>,
    #[serde(default)]
    pub customer_context: Option<String>,
}

impl RagRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            filters: SearchFilters::default(),
            date_range: None,
            enhance_query: true,
            use_reranking: false,
            rerank_top_k: None,
            customer_context: None,
        }
    }

    /// Filters sent to retrieval, with the request's date range folded in
    pub fn search_filters(&self) -> SearchFilters {
        let mut filters = self.filters.clone();
        if let Some(range) = &self.date_range {
            filters.date_range = Some(range.clone());
        }
        filters
    }
}

/// A retrieved document in pipeline order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub document: CommunicationDocument,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
}

/// Evidence cited by an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub document_id: String,
    /// Rerank score when present, else retrieval score
    pub relevance: f64,
    /// At most 200 characters
    pub excerpt: String,
    /// The model's own note on why the source matters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Stages that fell back; present on a response only when one did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedMode {
    pub query_enhancement_failed: bool,
    pub reranking_failed: bool,
    pub generation_failed: bool,
    pub reasons: Vec<String>,
}

impl DegradedMode {
    pub fn is_degraded(&self) -> bool {
        self.query_enhancement_failed || self.reranking_failed || self.generation_failed
    }

    pub(crate) fn enhancement_failed(&mut self, reason: impl Into<String>) {
        self.query_enhancement_failed = true;
        self.reasons.push(format!("query enhancement: {}", reason.into()));
    }

    pub(crate) fn reranking_failed(&mut self, reason: impl Into<String>) {
        self.reranking_failed = true;
        self.reasons.push(format!("reranking: {}", reason.into()));
    }

    pub(crate) fn generation_failed(&mut self, reason: impl Into<String>) {
        self.generation_failed = true;
        self.reasons.push(format!("generation: {}", reason.into()));
    }

    pub(crate) fn into_option(self) -> Option<Self> {
        self.is_degraded().then_some(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResponse {
    pub query: String,
    /// Query actually sent to retrieval
    pub search_query: String,
    pub answer: String,
    pub confidence: f64,
    pub results: Vec<RetrievalResult>,
    pub sources: Vec<Source>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_mode: Option<DegradedMode>,
}

/// Narrative summary of one customer's recent communications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub customer_id: String,
    pub summary: String,
    pub communication_count: usize,
    /// True when the channel tally replaced the generated summary
    pub fallback: bool,
}
