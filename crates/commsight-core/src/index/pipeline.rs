//! Chunk, contextualize, then hand chunks to the index

use super::contextual::{ContextualChunker, ContextualizedChunk, PrefixSource};
use super::record::CommunicationRecord;
use crate::error::{CommsightError, Result};
use crate::search::CommunicationMetadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sink for contextualized chunks (the vector/keyword index)
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Store chunks; returns how many were accepted
    async fn index_chunks(&self, chunks: &[ContextualizedChunk]) -> Result<usize>;
}

/// What happened to one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub document_id: String,
    pub chunks: usize,
    pub contextualized_with_llm: usize,
    pub template_fallbacks: usize,
    pub indexed: usize,
}

pub struct DocumentIndexingPipeline {
    chunker: Arc<ContextualChunker>,
    indexer: Arc<dyn DocumentIndexer>,
}

impl DocumentIndexingPipeline {
    pub fn new(chunker: Arc<ContextualChunker>, indexer: Arc<dyn DocumentIndexer>) -> Self {
        Self { chunker, indexer }
    }

    pub async fn index_document(
        &self,
        document_id: &str,
        content: &str,
        metadata: &CommunicationMetadata,
        summary: Option<&str>,
    ) -> Result<IndexReport> {
        let chunks = self.chunker.chunk_document(document_id, content, metadata);
        if chunks.is_empty() {
            return Err(CommsightError::Index(format!(
                "Document {} produced no chunks",
                document_id
            )));
        }
        tracing::info!("Contextualizing {} chunks of {}", chunks.len(), document_id);

        let contextualized = self
            .chunker
            .contextualize_chunks(chunks, content, summary)
            .await;
        let with_llm = contextualized
            .iter()
            .filter(|c| c.prefix_source == PrefixSource::Llm)
            .count();

        let indexed = self.indexer.index_chunks(&contextualized).await?;
        if indexed < contextualized.len() {
            tracing::warn!(
                "Indexer accepted {} of {} chunks for {}",
                indexed,
                contextualized.len(),
                document_id
            );
        }

        Ok(IndexReport {
            document_id: document_id.to_string(),
            chunks: contextualized.len(),
            contextualized_with_llm: with_llm,
            template_fallbacks: contextualized.len() - with_llm,
            indexed,
        })
    }

    /// Index a record under its stable id; `position` seeds ids for
    /// records that carry none
    pub async fn index_record(
        &self,
        record: &CommunicationRecord,
        position: usize,
    ) -> Result<IndexReport> {
        let document_id = record.document_id(position);
        let content = record.render_document();
        self.index_document(&document_id, &content, &record.metadata(), None)
            .await
    }
}
