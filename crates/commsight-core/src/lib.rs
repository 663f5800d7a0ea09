//! Commsight Core Library
//!
//! Retrieval-augmented answers over a bank's customer communications.
//!
//! # Features
//! - LLM query enhancement with caching and a synonym fallback
//! - Contextual chunking with shared, cache-marked document context
//! - Retrieve / rerank / generate orchestration with degraded-mode reporting
//! - Structured research, insight and trend formatting of model output

pub mod config;
pub mod error;
pub mod format;
pub mod index;
pub mod llm;
pub mod query;
pub mod rag;
pub mod search;

pub use config::{
    ChunkerConfig, Config, EnhancerConfig, FormatterConfig, LLMServiceConfig, RagConfig,
    RerankServiceConfig, SearchServiceConfig,
};
pub use error::{CommsightError, Error, Result};
pub use format::{
    create_quick_summary, detect_granularity, DataPoint, Granularity, InsightCard,
    ResponseFormatter, StructuredResearchResponse, TrendAnalysis,
};
pub use index::{
    Chunk, CommunicationRecord, ContextualChunker, ContextualizedChunk, DocumentIndexer,
    DocumentIndexingPipeline, IndexReport,
};
pub use llm::{
    BuiltinTemplates, Cache, InMemoryCache, LLMClient, MetricsSnapshot, PromptTemplates,
    VLLMClient,
};
pub use query::{EnhanceOptions, EnhancedQuery, QueryEnhancer};
pub use rag::{DegradedMode, RagOrchestrator, RagRequest, RagResponse, RetrievalResult};
pub use search::{
    CommunicationDocument, CommunicationMetadata, DateRange, HttpReranker, HttpSearchClient,
    Reranker, SearchFilters, SearchService,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "commsight";
