//! Contextual chunking: split a document, then prepend a short
//! situating prefix to each chunk before it is embedded.

use super::chunker::split_spans;
use crate::config::ChunkerConfig;
use crate::error::{CommsightError, Result};
use crate::llm::{
    templates, with_deadline, CallOptions, ChatMessage, CompletionRequest, LLMClient,
    PromptTemplates, SystemBlock,
};
use crate::search::CommunicationMetadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CONTEXT_SYSTEM_PROMPT: &str = "You situate excerpts of customer communications within \
    their source document so they can be retrieved on their own. Be brief and factual.";

const CONTEXT_MAX_TOKENS: u32 = 150;

/// A slice of a document with its position and inherited metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// `{document_id}_chunk_{index}`
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// Byte offset of `content` in the source document
    pub start_char: usize,
    pub end_char: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub metadata: CommunicationMetadata,
}

/// Where a chunk's context prefix came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixSource {
    Llm,
    Template,
}

/// Chunk plus the prefix that situates it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualizedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub context_prefix: String,
    /// `context_prefix + "\n\n" + content`
    pub contextualized_content: String,
    pub prefix_source: PrefixSource,
}

impl ContextualizedChunk {
    fn new(chunk: Chunk, prefix: String, source: PrefixSource) -> Self {
        let contextualized_content = format!("{}\n\n{}", prefix, chunk.content);
        Self {
            chunk,
            context_prefix: prefix,
            contextualized_content,
            prefix_source: source,
        }
    }
}

/// Splits documents and contextualizes chunks through the LLM
pub struct ContextualChunker {
    client: Arc<dyn LLMClient>,
    templates: Arc<dyn PromptTemplates>,
    config: ChunkerConfig,
}

impl ContextualChunker {
    pub fn new(
        client: Arc<dyn LLMClient>,
        templates: Arc<dyn PromptTemplates>,
        config: ChunkerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            templates,
            config,
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split a document into chunks. Pure; no LLM involvement.
    pub fn chunk_document(
        &self,
        document_id: &str,
        content: &str,
        metadata: &CommunicationMetadata,
    ) -> Vec<Chunk> {
        chunk_text(document_id, content, metadata, &self.config)
    }

    /// Attach a context prefix to every chunk, in input order.
    ///
    /// Chunks go out in batches of `batch_size`; a batch settles completely
    /// before the next starts. The document and summary travel in a cached
    /// system block shared by every call. Any chunk whose call fails or
    /// times out gets a prefix built from its metadata instead.
    pub async fn contextualize_chunks(
        &self,
        chunks: Vec<Chunk>,
        full_document: &str,
        summary: Option<&str>,
    ) -> Vec<ContextualizedChunk> {
        let document_block = SystemBlock::cached(document_context(full_document, summary));
        let call_options = CallOptions::bucket(self.config.rate_limit_key.clone());
        let mut out = Vec::with_capacity(chunks.len());
        let mut pending = chunks.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(self.config.batch_size).collect();
            let calls = batch
                .iter()
                .map(|chunk| self.generate_prefix(chunk, &document_block, &call_options));
            let results = futures::future::join_all(calls).await;

            for (chunk, result) in batch.into_iter().zip(results) {
                let contextualized = match result {
                    Ok(prefix) => ContextualizedChunk::new(chunk, prefix, PrefixSource::Llm),
                    Err(e) => {
                        tracing::warn!(
                            "Context generation failed for chunk {}: {}, using metadata template",
                            chunk.id,
                            e
                        );
                        let prefix = template_prefix(&chunk.metadata);
                        ContextualizedChunk::new(chunk, prefix, PrefixSource::Template)
                    }
                };
                out.push(contextualized);
            }
        }

        out
    }

    async fn generate_prefix(
        &self,
        chunk: &Chunk,
        document_block: &SystemBlock,
        call_options: &CallOptions,
    ) -> Result<String> {
        let prompt = self
            .templates
            .render_named(templates::CHUNK_CONTEXT, &[("chunk", chunk.content.as_str())])?;

        let request = CompletionRequest {
            messages: vec![ChatMessage::user(prompt)],
            system_blocks: vec![
                SystemBlock::plain(CONTEXT_SYSTEM_PROMPT),
                document_block.clone(),
            ],
            max_tokens: Some(CONTEXT_MAX_TOKENS),
            temperature: Some(0.0),
            ..Default::default()
        };

        let completion = with_deadline(
            "chunk contextualization",
            self.config.timeout(),
            self.client.complete(request, call_options),
        )
        .await?;

        let prefix = completion.content.trim();
        if prefix.is_empty() {
            return Err(CommsightError::Llm("Empty context response".to_string()));
        }
        Ok(truncate_chars(prefix, self.config.max_prefix_chars))
    }
}

/// Split and wrap spans into [`Chunk`]s
pub fn chunk_text(
    document_id: &str,
    content: &str,
    metadata: &CommunicationMetadata,
    config: &ChunkerConfig,
) -> Vec<Chunk> {
    let spans = split_spans(
        content,
        config.chunk_size,
        config.overlap,
        config.min_chunk_size,
    );
    let total = spans.len();

    spans
        .into_iter()
        .enumerate()
        .map(|(index, span)| Chunk {
            id: format!("{}_chunk_{}", document_id, index),
            document_id: document_id.to_string(),
            content: content[span.start..span.end].to_string(),
            start_char: span.start,
            end_char: span.end,
            chunk_index: index,
            total_chunks: total,
            metadata: metadata.clone(),
        })
        .collect()
}

fn document_context(full_document: &str, summary: Option<&str>) -> String {
    match summary {
        Some(summary) if !summary.trim().is_empty() => format!(
            "<document>\n{}\n</document>\n\n<summary>\n{}\n</summary>",
            full_document, summary
        ),
        _ => format!("<document>\n{}\n</document>", full_document),
    }
}

/// Clamp to `max_chars` characters, ending in "..." when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", keep.trim_end())
}

/// Deterministic prefix from metadata, e.g.
/// "Call transcript from Dana Ruiz via phone on March 4, 2024 with negative sentiment."
pub fn template_prefix(metadata: &CommunicationMetadata) -> String {
    let mut parts = vec![metadata
        .source_type
        .as_deref()
        .map(humanize)
        .unwrap_or_else(|| "Communication".to_string())];

    if let Some(name) = metadata.customer_name.as_deref().or(metadata.customer_id.as_deref()) {
        parts.push(format!("from {}", name));
    }
    if let Some(channel) = &metadata.channel {
        parts.push(format!("via {}", channel));
    }
    if let Some(ts) = metadata.timestamp {
        parts.push(format!("on {}", ts.format("%B %-d, %Y")));
    }
    if let Some(sentiment) = &metadata.sentiment {
        parts.push(format!("with {} sentiment", sentiment));
    }

    format!("{}.", parts.join(" "))
}

fn humanize(source_type: &str) -> String {
    let spaced = source_type.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Communication".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn metadata() -> CommunicationMetadata {
        CommunicationMetadata {
            source_type: Some("call_transcript".into()),
            customer_name: Some("Dana Ruiz".into()),
            channel: Some("phone".into()),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()),
            sentiment: Some("negative".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_template_prefix_full() {
        assert_eq!(
            template_prefix(&metadata()),
            "Call transcript from Dana Ruiz via phone on March 4, 2024 with negative sentiment."
        );
    }

    #[test]
    fn test_template_prefix_sparse() {
        assert_eq!(template_prefix(&CommunicationMetadata::default()), "Communication.");
        let meta = CommunicationMetadata {
            source_type: Some("email".into()),
            customer_id: Some("C-42".into()),
            ..Default::default()
        };
        assert_eq!(template_prefix(&meta), "Email from C-42.");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 300), "short");
        let long = "word ".repeat(100);
        let cut = truncate_chars(&long, 300);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 300);
    }

    #[test]
    fn test_chunk_text_ids_and_offsets() {
        let config = ChunkerConfig {
            chunk_size: 50,
            overlap: 10,
            min_chunk_size: 5,
            ..Default::default()
        };
        let content = "The customer called about a declined card. ".repeat(6);
        let chunks = chunk_text("doc-7", &content, &metadata(), &config);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("doc-7_chunk_{}", i));
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.total_chunks, chunks.len());
            assert_eq!(&content[chunk.start_char..chunk.end_char], chunk.content);
            assert_eq!(chunk.metadata, metadata());
        }
    }

    #[test]
    fn test_contextualized_content_layout() {
        let chunk = chunk_text("d", "Some body text here", &metadata(), &ChunkerConfig {
            min_chunk_size: 1,
            ..Default::default()
        })
        .remove(0);
        let ctx = ContextualizedChunk::new(chunk, "Prefix.".into(), PrefixSource::Llm);
        assert_eq!(ctx.contextualized_content, "Prefix.\n\nSome body text here");
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let chunk = chunk_text("d", "Some body text here", &metadata(), &ChunkerConfig {
            min_chunk_size: 1,
            ..Default::default()
        })
        .remove(0);
        let ctx = ContextualizedChunk::new(chunk, "P.".into(), PrefixSource::Template);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["documentId"], "d");
        assert_eq!(json["contextPrefix"], "P.");
        assert_eq!(json["prefixSource"], "template");
    }
}
