//! Enhance, retrieve, rerank, generate

use super::answer::{
    build_context, excerpt, fallback_answer, parse_answer, GeneratedAnswer, NO_RESULTS_ANSWER,
};
use super::types::{
    CustomerSummary, DegradedMode, RagRequest, RagResponse, RetrievalResult,
};
use crate::config::RagConfig;
use crate::error::{CommsightError, Result};
use crate::index::{DocumentIndexingPipeline, IndexReport};
use crate::llm::{templates, with_deadline, CallOptions, LLMClient, PromptTemplates};
use crate::query::{EnhanceOptions, EnhancementSource, QueryEnhancer};
use crate::search::{
    CommunicationDocument, RerankDocument, Reranker, SearchFilters, SearchService,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Rate-limit bucket for answer generation and summaries
pub const GENERATION_BUCKET: &str = "rag-generation";

/// Results requested for customer questions
pub const CUSTOMER_TOP_K: usize = 15;

/// Leading characters of a document used as its similarity query
const SIMILARITY_QUERY_CHARS: usize = 1000;

const ANSWER_SYSTEM_PROMPT: &str = "You are an analyst answering questions about a bank's \
    customer communications. Ground every statement in the provided communications and \
    output ONLY valid JSON.";

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize customer relationships for bank staff. \
    Be concise and specific.";

/// Composes enhancement, retrieval, reranking and generation
pub struct RagOrchestrator {
    enhancer: Arc<QueryEnhancer>,
    search: Arc<dyn SearchService>,
    reranker: Option<Arc<dyn Reranker>>,
    client: Arc<dyn LLMClient>,
    templates: Arc<dyn PromptTemplates>,
    indexing: Option<Arc<DocumentIndexingPipeline>>,
    config: RagConfig,
}

impl RagOrchestrator {
    pub fn new(
        enhancer: Arc<QueryEnhancer>,
        search: Arc<dyn SearchService>,
        client: Arc<dyn LLMClient>,
        templates: Arc<dyn PromptTemplates>,
        config: RagConfig,
    ) -> Self {
        Self {
            enhancer,
            search,
            reranker: None,
            client,
            templates,
            indexing: None,
            config,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_indexing(mut self, pipeline: Arc<DocumentIndexingPipeline>) -> Self {
        self.indexing = Some(pipeline);
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Run the full pipeline. Only retrieval failures are returned as
    /// errors; every other stage falls back and is reported through
    /// `degraded_mode`.
    pub async fn query(&self, request: &RagRequest) -> Result<RagResponse> {
        let started = Instant::now();
        let mut degraded = DegradedMode::default();
        let filters = request.search_filters();
        let top_k = self
            .config
            .resolve_top_k(request.top_k, self.config.default_top_k)?;
        let rerank_top_k = self
            .config
            .resolve_top_k(request.rerank_top_k, self.config.rerank_top_k)?;

        let search_query = if request.enhance_query {
            self.enhance_stage(request, &filters, &mut degraded).await
        } else {
            request.query.clone()
        };

        tracing::info!("Retrieving top {} for query: {}", top_k, search_query);
        let mut results = self.retrieve(&search_query, top_k, &filters).await?;
        tracing::info!("Retrieved {} results", results.len());

        if request.use_reranking && !results.is_empty() {
            results = self
                .rerank_stage(&request.query, results, rerank_top_k, &mut degraded)
                .await;
        }

        let generated = if results.is_empty() {
            tracing::info!("No results, skipping generation");
            GeneratedAnswer {
                answer: NO_RESULTS_ANSWER.to_string(),
                confidence: 0.0,
                sources: Vec::new(),
            }
        } else {
            self.generate_stage(&request.query, &results, &mut degraded)
                .await
        };

        Ok(RagResponse {
            query: request.query.clone(),
            search_query,
            answer: generated.answer,
            confidence: generated.confidence,
            results,
            sources: generated.sources,
            processing_time_ms: started.elapsed().as_millis() as u64,
            degraded_mode: degraded.into_option(),
        })
    }

    async fn enhance_stage(
        &self,
        request: &RagRequest,
        filters: &SearchFilters,
        degraded: &mut DegradedMode,
    ) -> String {
        let options = EnhanceOptions {
            time_range: filters.date_range.as_ref().map(|range| range.describe()),
            customer_context: request.customer_context.clone(),
            selected_filters: if filters.is_empty() {
                None
            } else {
                serde_json::to_string(filters).ok()
            },
            skip_cache: false,
        };

        let outcome = self.enhancer.enhance_detailed(&request.query, &options).await;
        if let EnhancementSource::Fallback { reason } = &outcome.source {
            degraded.enhancement_failed(reason.clone());
            return request.query.clone();
        }

        let enhanced = outcome
            .enhanced
            .primary_query()
            .map(str::to_string)
            .unwrap_or_else(|| request.query.clone());
        tracing::info!("Query enhanced ({:?}): {}", outcome.source, enhanced);
        enhanced
    }

    /// Hybrid search for `2 * top_k`, dropping hits below `min_score` and
    /// keeping at most `top_k` in service order. Filters are applied by the
    /// search service.
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<RetrievalResult>> {
        let response = self
            .search
            .search_hybrid(query, top_k.saturating_mul(2), filters)
            .await?;

        let mut results = Vec::with_capacity(top_k.min(response.hits.len()));
        for hit in response.hits {
            if hit.score < self.config.min_score {
                tracing::debug!("Dropping {} (score {:.3})", hit.source.id, hit.score);
                continue;
            }
            results.push(RetrievalResult {
                document: hit.source,
                score: hit.score,
                rerank_score: None,
                highlights: hit.highlight,
            });
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }

    async fn rerank_stage(
        &self,
        query: &str,
        results: Vec<RetrievalResult>,
        rerank_top_k: usize,
        degraded: &mut DegradedMode,
    ) -> Vec<RetrievalResult> {
        match self.rerank(query, &results, rerank_top_k).await {
            Ok(reranked) => {
                tracing::info!("Reranked to {} results", reranked.len());
                reranked
            }
            Err(e) => {
                tracing::warn!("Reranking failed: {}, keeping retrieval order", e);
                degraded.reranking_failed(e.to_string());
                results.into_iter().take(rerank_top_k).collect()
            }
        }
    }

    async fn rerank(
        &self,
        query: &str,
        results: &[RetrievalResult],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let reranker = self
            .reranker
            .as_ref()
            .ok_or_else(|| CommsightError::Rerank("No reranker configured".to_string()))?;

        let documents: Vec<RerankDocument> = results
            .iter()
            .enumerate()
            .map(|(i, r)| RerankDocument {
                id: i.to_string(),
                text: r.document.content.clone(),
            })
            .collect();

        let ranked = reranker.rerank(query, &documents, top_k).await?;

        let mut taken = vec![false; results.len()];
        let mut reranked = Vec::with_capacity(top_k.min(results.len()));
        for item in ranked {
            let index = match item.id.parse::<usize>() {
                Ok(i) if i < results.len() && !taken[i] => i,
                _ => {
                    tracing::debug!("Ignoring rerank id {}", item.id);
                    continue;
                }
            };
            taken[index] = true;
            let mut result = results[index].clone();
            result.rerank_score = Some(item.score);
            reranked.push(result);
            if reranked.len() >= top_k {
                break;
            }
        }
        Ok(reranked)
    }

    async fn generate_stage(
        &self,
        query: &str,
        results: &[RetrievalResult],
        degraded: &mut DegradedMode,
    ) -> GeneratedAnswer {
        let context = build_context(
            results,
            self.config.max_doc_chars,
            self.config.max_context_chars,
        );
        tracing::debug!(
            "Generation context: {} documents, {} chars",
            context.included.len(),
            context.text.len()
        );

        match self.generate(query, &context.text).await {
            Ok(response) => {
                tracing::debug!("Raw generation response: {}", response);
                parse_answer(&response, &context.included)
            }
            Err(e) => {
                tracing::warn!("Answer generation failed: {}, returning extractive answer", e);
                degraded.generation_failed(e.to_string());
                let included: Vec<&RetrievalResult> = if context.included.is_empty() {
                    results.iter().collect()
                } else {
                    context.included
                };
                fallback_answer(&included)
            }
        }
    }

    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let prompt = self
            .templates
            .render_named(templates::RAG_ANSWER, &[("query", query), ("context", context)])?;
        with_deadline(
            "answer generation",
            self.config.generation_timeout(),
            self.client.prompt(
                &prompt,
                Some(ANSWER_SYSTEM_PROMPT),
                &CallOptions::bucket(GENERATION_BUCKET),
            ),
        )
        .await
    }

    /// Retrieval only
    pub async fn semantic_search(
        &self,
        query: &str,
        top_k: Option<usize>,
        filters: &SearchFilters,
    ) -> Result<Vec<RetrievalResult>> {
        let top_k = self.config.resolve_top_k(top_k, self.config.default_top_k)?;
        self.retrieve(query, top_k, filters).await
    }

    /// Documents resembling `document_id`, excluding itself
    pub async fn find_similar(
        &self,
        document_id: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievalResult>> {
        let document = self
            .search
            .get_document(document_id)
            .await?
            .ok_or_else(|| CommsightError::DocumentNotFound(document_id.to_string()))?;

        let top_k = self.config.resolve_top_k(top_k, self.config.default_top_k)?;
        let query: String = document.content.chars().take(SIMILARITY_QUERY_CHARS).collect();
        let mut results = self
            .retrieve(&query, top_k.saturating_add(1), &SearchFilters::default())
            .await?;
        results.retain(|r| r.document.id != document_id);
        results.truncate(top_k);
        Ok(results)
    }

    /// Question scoped to one customer, always reranked
    pub async fn ask_about_customer(
        &self,
        customer_id: &str,
        question: &str,
    ) -> Result<RagResponse> {
        let request = RagRequest {
            top_k: Some(CUSTOMER_TOP_K.min(self.config.max_top_k)),
            filters: SearchFilters::for_customer(customer_id),
            use_reranking: true,
            customer_context: Some(format!("Customer {}", customer_id)),
            ..RagRequest::new(question)
        };
        self.query(&request).await
    }

    /// Narrative summary of a customer's recent communications, or a
    /// channel tally when generation fails
    pub async fn summarize_customer_communications(
        &self,
        customer_id: &str,
    ) -> Result<CustomerSummary> {
        let communications = self
            .search
            .customer_communications(customer_id, self.config.customer_summary_batch)
            .await?;

        if communications.is_empty() {
            return Ok(CustomerSummary {
                customer_id: customer_id.to_string(),
                summary: format!("No communications found for customer {}.", customer_id),
                communication_count: 0,
                fallback: false,
            });
        }

        let customer_name = communications
            .iter()
            .find_map(|c| c.metadata.customer_name.clone())
            .unwrap_or_else(|| customer_id.to_string());

        let (summary, fallback) = match self
            .generate_summary(&customer_name, &communications)
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => (summary.trim().to_string(), false),
            Ok(_) => {
                tracing::warn!("Empty customer summary, using channel tally");
                (channel_tally(&communications), true)
            }
            Err(e) => {
                tracing::warn!("Customer summary failed: {}, using channel tally", e);
                (channel_tally(&communications), true)
            }
        };

        Ok(CustomerSummary {
            customer_id: customer_id.to_string(),
            summary,
            communication_count: communications.len(),
            fallback,
        })
    }

    async fn generate_summary(
        &self,
        customer_name: &str,
        communications: &[CommunicationDocument],
    ) -> Result<String> {
        let listing = communications
            .iter()
            .map(|c| {
                let date = c
                    .metadata
                    .timestamp
                    .map(|ts| ts.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "undated".to_string());
                let channel = c.metadata.channel.as_deref().unwrap_or("unknown");
                format!("- {} [{}] {}", date, channel, excerpt(&c.content))
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = self.templates.render_named(
            templates::CUSTOMER_SUMMARY,
            &[("customer_name", customer_name), ("communications", &listing)],
        )?;

        with_deadline(
            "customer summary",
            self.config.generation_timeout(),
            self.client.prompt(
                &prompt,
                Some(SUMMARY_SYSTEM_PROMPT),
                &CallOptions::bucket(GENERATION_BUCKET),
            ),
        )
        .await
    }

    /// Chunk, contextualize and index one document
    pub async fn index_document(
        &self,
        document: &CommunicationDocument,
        summary: Option<&str>,
    ) -> Result<IndexReport> {
        let pipeline = self
            .indexing
            .as_ref()
            .ok_or_else(|| CommsightError::Config("No indexing pipeline configured".into()))?;
        pipeline
            .index_document(&document.id, &document.content, &document.metadata, summary)
            .await
    }
}

/// "N communications: 3 email, 2 phone", busiest channel first
pub fn channel_tally(communications: &[CommunicationDocument]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in communications {
        *counts
            .entry(c.metadata.channel.as_deref().unwrap_or("unknown"))
            .or_default() += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let parts: Vec<String> = counts
        .iter()
        .map(|(channel, n)| format!("{} {}", n, channel))
        .collect();
    format!("{} communications: {}", communications.len(), parts.join(", "))
}
