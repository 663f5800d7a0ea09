//! Terminal output formatter

use commsight_core::format::TrendAnalysis;
use commsight_core::index::{Chunk, ContextualizedChunk, IndexReport};
use commsight_core::query::EnhancedQuery;
use commsight_core::rag::{CustomerSummary, RagResponse, RetrievalResult};

const PREVIEW_LINES: usize = 5;

pub fn format_rag_response(response: &RagResponse) -> String {
    let mut output = format!("{}\n\n", response.answer.trim());
    output.push_str(&format!(
        "Confidence: {:.0}%  ({} ms, searched \"{}\")\n",
        response.confidence * 100.0,
        response.processing_time_ms,
        response.search_query
    ));

    if !response.sources.is_empty() {
        output.push_str("\nSources:\n");
        for source in &response.sources {
            output.push_str(&format!(
                "{:>4.0}% #{}  {}\n",
                source.relevance * 100.0,
                source.document_id,
                source.excerpt
            ));
        }
    }

    if let Some(degraded) = &response.degraded_mode {
        output.push_str("\nDegraded:\n");
        for reason in &degraded.reasons {
            output.push_str(&format!("  - {}\n", reason));
        }
    }

    output
}

pub fn format_results(results: &[RetrievalResult], full: bool) -> String {
    if results.is_empty() {
        return "No matching communications.\n".to_string();
    }

    let mut output = String::new();
    for result in results {
        let score = result.rerank_score.unwrap_or(result.score);
        let channel = result.document.metadata.channel.as_deref().unwrap_or("-");
        output.push_str(&format!(
            "{:>4.0}% #{} [{}]\n",
            score * 100.0,
            result.document.id,
            channel
        ));

        if full {
            let lines: Vec<&str> = result.document.content.lines().take(PREVIEW_LINES).collect();
            for line in &lines {
                output.push_str(&format!("  {}\n", line));
            }
            if result.document.content.lines().count() > PREVIEW_LINES {
                output.push_str("  ...\n");
            }
        } else if let Some(highlights) = &result.highlights {
            for highlight in highlights {
                output.push_str(&format!("  {}\n", highlight));
            }
        }
    }

    output
}

pub fn format_customer_summary(summary: &CustomerSummary) -> String {
    let mut output = format!(
        "Customer {} ({} communications)\n\n{}\n",
        summary.customer_id, summary.communication_count, summary.summary
    );
    if summary.fallback {
        output.push_str("\n(summary generation unavailable; channel tally shown)\n");
    }
    output
}

pub fn format_index_reports(reports: &[IndexReport]) -> String {
    let mut output = String::new();
    for report in reports {
        output.push_str(&format!(
            "{}: {} chunks, {} indexed ({} LLM, {} template)\n",
            report.document_id,
            report.chunks,
            report.indexed,
            report.contextualized_with_llm,
            report.template_fallbacks
        ));
    }
    output
}

pub fn format_enhanced(enhanced: &EnhancedQuery) -> String {
    let mut output = format!("Intent: {}\n\nQueries:\n", enhanced.original_intent);
    for query in &enhanced.enhanced_queries {
        output.push_str(&format!(
            "  {:.2}  {}  ({})\n",
            query.weight, query.query, query.purpose
        ));
    }

    if !enhanced.key_terms.is_empty() {
        let terms: Vec<&str> = enhanced.key_terms.iter().map(String::as_str).collect();
        output.push_str(&format!("\nKey terms: {}\n", terms.join(", ")));
    }
    if !enhanced.synonym_expansion.is_empty() {
        output.push_str("\nSynonyms:\n");
        for (term, synonyms) in &enhanced.synonym_expansion {
            output.push_str(&format!("  {}: {}\n", term, synonyms.join(", ")));
        }
    }
    if !enhanced.sub_questions.is_empty() {
        output.push_str("\nSub-questions:\n");
        output.push_str(&format_numbered(&enhanced.sub_questions));
    }
    output
}

pub fn format_numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{:>3}. {}\n", i + 1, item))
        .collect()
}

pub fn format_chunks(chunks: &[Chunk]) -> String {
    let mut output = String::new();
    for chunk in chunks {
        output.push_str(&format!(
            "{} [{}..{}] {} bytes\n",
            chunk.id,
            chunk.start_char,
            chunk.end_char,
            chunk.content.len()
        ));
    }
    output
}

pub fn format_contextualized(chunks: &[ContextualizedChunk]) -> String {
    let mut output = String::new();
    for chunk in chunks {
        output.push_str(&format!(
            "{} ({:?})\n  {}\n",
            chunk.chunk.id, chunk.prefix_source, chunk.context_prefix
        ));
    }
    output
}

pub fn format_trend(analysis: &TrendAnalysis) -> String {
    let mut output = format!(
        "{} ({}): {:?}, {:+.1}%\n\n{}\n",
        analysis.metric,
        analysis.granularity.as_str(),
        analysis.direction,
        analysis.change_percent,
        analysis.summary
    );
    if !analysis.anomalies.is_empty() {
        output.push_str("\nAnomalies:\n");
        for anomaly in &analysis.anomalies {
            output.push_str(&format!("  {}: {}\n", anomaly.period, anomaly.description));
        }
    }
    if !analysis.drivers.is_empty() {
        output.push_str("\nDrivers:\n");
        for driver in &analysis.drivers {
            output.push_str(&format!("  - {}\n", driver));
        }
    }
    output.push_str(&format!("\nForecast: {}\n", analysis.forecast));
    output
}
