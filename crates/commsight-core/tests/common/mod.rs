//! In-process fakes for the collaborator traits

#![allow(dead_code)]

use async_trait::async_trait;
use commsight_core::error::{CommsightError, Result};
use commsight_core::index::{ContextualizedChunk, DocumentIndexer};
use commsight_core::llm::{CallOptions, Completion, CompletionRequest, LLMClient};
use commsight_core::search::{
    CommunicationDocument, CommunicationMetadata, RerankDocument, RerankResult, Reranker,
    SearchFilters, SearchHit, SearchResponse, SearchService,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;

/// LLM client answering from a closure, recording every request
pub struct ScriptedLLM {
    responder: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub buckets: Mutex<Vec<Option<String>>>,
}

impl ScriptedLLM {
    pub fn new(responder: impl Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            buckets: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(CommsightError::Llm(message.clone())))
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// All message and system text of a request, for matching in responders
pub fn request_text(request: &CompletionRequest) -> String {
    let mut text: Vec<&str> = request.system_blocks.iter().map(|b| b.text.as_str()).collect();
    text.extend(request.messages.iter().map(|m| m.content.as_str()));
    text.join("\n")
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn complete(&self, request: CompletionRequest, options: &CallOptions) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.buckets.lock().unwrap().push(options.rate_limit_key.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result.map(|content| Completion { content })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn document(id: &str, content: &str) -> CommunicationDocument {
    CommunicationDocument {
        id: id.to_string(),
        content: content.to_string(),
        metadata: CommunicationMetadata {
            channel: Some("email".to_string()),
            customer_id: Some("cust-1".to_string()),
            ..Default::default()
        },
    }
}

pub fn hit(id: &str, content: &str, score: f64) -> SearchHit {
    SearchHit {
        source: document(id, content),
        score,
        highlight: None,
    }
}

/// Search service serving fixed hits and recording what it was asked
#[derive(Default)]
pub struct FakeSearch {
    pub hits: Vec<SearchHit>,
    pub customer_docs: Vec<CommunicationDocument>,
    pub fail: bool,
    pub queries: Mutex<Vec<(String, usize, SearchFilters)>>,
}

impl FakeSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    pub fn last_query(&self) -> Option<(String, usize, SearchFilters)> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SearchService for FakeSearch {
    async fn search_hybrid(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<SearchResponse> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit, filters.clone()));
        if self.fail {
            return Err(CommsightError::Search("index unavailable".to_string()));
        }
        Ok(SearchResponse {
            hits: self.hits.iter().take(limit).cloned().collect(),
        })
    }

    async fn get_document(&self, id: &str) -> Result<Option<CommunicationDocument>> {
        Ok(self
            .hits
            .iter()
            .map(|h| &h.source)
            .chain(self.customer_docs.iter())
            .find(|d| d.id == id)
            .cloned())
    }

    async fn customer_communications(
        &self,
        _customer_id: &str,
        limit: usize,
    ) -> Result<Vec<CommunicationDocument>> {
        Ok(self.customer_docs.iter().take(limit).cloned().collect())
    }
}

pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _: &str, _: &[RerankDocument], _: usize) -> Result<Vec<RerankResult>> {
        Err(CommsightError::Rerank("model offline".to_string()))
    }
}

/// Ranks documents in reverse input order
pub struct ReverseReranker;

#[async_trait]
impl Reranker for ReverseReranker {
    async fn rerank(
        &self,
        _: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RerankResult>> {
        Ok(documents
            .iter()
            .rev()
            .take(top_k)
            .enumerate()
            .map(|(rank, doc)| RerankResult {
                id: doc.id.clone(),
                score: 1.0 - rank as f64 * 0.1,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingIndexer {
    pub chunks: Mutex<Vec<ContextualizedChunk>>,
}

#[async_trait]
impl DocumentIndexer for RecordingIndexer {
    async fn index_chunks(&self, chunks: &[ContextualizedChunk]) -> Result<usize> {
        self.chunks.lock().unwrap().extend_from_slice(chunks);
        Ok(chunks.len())
    }
}
