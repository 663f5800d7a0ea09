//! Chunk command

use crate::app::{ChunkArgs, OutputFormat};
use crate::output::{render, terminal};
use crate::services;
use anyhow::{Context, Result};
use commsight_core::index::{chunk_text, load_records};
use commsight_core::search::CommunicationMetadata;
use commsight_core::Config;
use std::path::Path;

/// One document to split: id, text, metadata
struct Source {
    id: String,
    content: String,
    metadata: CommunicationMetadata,
}

pub async fn run(args: ChunkArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let mut config = config.clone();
    if let Some(size) = args.chunk_size {
        config.chunker.chunk_size = size;
    }
    if let Some(overlap) = args.overlap {
        config.chunker.overlap = overlap;
    }
    if let Some(min) = args.min_chunk_size {
        config.chunker.min_chunk_size = min;
    }
    config.chunker.validate()?;

    let sources = read_sources(&args.file)?;

    if args.contextualize {
        let chunker = services::chunker(&config, services::llm_client(&config)?)?;
        let mut all = Vec::new();
        for source in &sources {
            let chunks = chunker.chunk_document(&source.id, &source.content, &source.metadata);
            all.extend(chunker.contextualize_chunks(chunks, &source.content, None).await);
        }
        print!("{}", render(all.as_slice(), format, terminal::format_contextualized));
    } else {
        let all: Vec<_> = sources
            .iter()
            .flat_map(|s| chunk_text(&s.id, &s.content, &s.metadata, &config.chunker))
            .collect();
        print!("{}", render(all.as_slice(), format, terminal::format_chunks));
    }
    Ok(())
}

fn is_records_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "yml" | "yaml")
    )
}

fn read_sources(path: &Path) -> Result<Vec<Source>> {
    if is_records_file(path) {
        let records = load_records(path)?;
        return Ok(records
            .iter()
            .enumerate()
            .map(|(position, record)| Source {
                id: record.document_id(position),
                content: record.render_document(),
                metadata: record.metadata(),
            })
            .collect());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    Ok(vec![Source {
        id,
        content,
        metadata: CommunicationMetadata::default(),
    }])
}
