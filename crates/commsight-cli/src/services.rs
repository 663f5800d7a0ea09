//! Wiring of HTTP collaborators and core components from config

use anyhow::Result;
use commsight_core::{
    BuiltinTemplates, Config, ContextualChunker, DocumentIndexingPipeline, HttpReranker,
    HttpSearchClient, InMemoryCache, LLMClient, PromptTemplates, QueryEnhancer,
    RagOrchestrator, ResponseFormatter, VLLMClient,
};
use std::sync::Arc;

pub fn llm_client(config: &Config) -> Result<Arc<dyn LLMClient>> {
    let client = VLLMClient::with_rate_limits(
        config.llm_service.clone(),
        config.rate_limits.clone(),
    )?;
    Ok(Arc::new(client))
}

fn templates() -> Arc<dyn PromptTemplates> {
    Arc::new(BuiltinTemplates::new())
}

pub fn enhancer(config: &Config, client: Arc<dyn LLMClient>) -> Arc<QueryEnhancer> {
    Arc::new(QueryEnhancer::new(
        client,
        Arc::new(InMemoryCache::new()),
        templates(),
        config.enhancer.clone(),
    ))
}

pub fn chunker(config: &Config, client: Arc<dyn LLMClient>) -> Result<Arc<ContextualChunker>> {
    Ok(Arc::new(ContextualChunker::new(
        client,
        templates(),
        config.chunker.clone(),
    )?))
}

pub fn formatter(config: &Config, client: Arc<dyn LLMClient>) -> ResponseFormatter {
    ResponseFormatter::new(client, templates(), config.formatter.clone())
}

pub fn indexing_pipeline(
    config: &Config,
    client: Arc<dyn LLMClient>,
) -> Result<Arc<DocumentIndexingPipeline>> {
    let indexer = Arc::new(HttpSearchClient::new(config.search_service.clone())?);
    Ok(Arc::new(DocumentIndexingPipeline::new(
        chunker(config, client)?,
        indexer,
    )))
}

/// Full orchestrator: search service, reranker and indexing all over HTTP
pub fn orchestrator(config: &Config) -> Result<RagOrchestrator> {
    let client = llm_client(config)?;
    let search = Arc::new(HttpSearchClient::new(config.search_service.clone())?);
    let reranker = Arc::new(HttpReranker::new(config.rerank_service.clone())?);

    Ok(RagOrchestrator::new(
        enhancer(config, client.clone()),
        search,
        client.clone(),
        templates(),
        config.rag.clone(),
    )
    .with_reranker(reranker)
    .with_indexing(indexing_pipeline(config, client)?))
}
