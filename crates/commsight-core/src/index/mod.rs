//! Indexing pipeline
//!
//! Record loading, contextual chunking, and hand-off to the document index.

mod chunker;
mod contextual;
mod pipeline;
mod record;

pub use chunker::{split_spans, Span, SEPARATORS};
pub use contextual::{
    chunk_text, template_prefix, truncate_chars, Chunk, ContextualChunker, ContextualizedChunk,
    PrefixSource,
};
pub use pipeline::{DocumentIndexer, DocumentIndexingPipeline, IndexReport};
pub use record::{load_records, parse_records, CommunicationRecord, Turn};
