//! Context budgeting for generation and parsing of generated answers

use super::types::{RetrievalResult, Source};
use crate::index::truncate_chars;
use crate::llm::{f64_field, parse_json_object, str_field};
use serde_json::Value;

/// Confidence when the model gives an answer but no confidence
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Confidence for answers taken as plain text
pub const PLAIN_TEXT_CONFIDENCE: f64 = 0.6;

/// Confidence for the extractive answer used when generation fails
pub const GENERATION_FAILED_CONFIDENCE: f64 = 0.3;

pub const EXCERPT_CHARS: usize = 200;

/// Documents cited when the answer carries no usable citations
const PLAIN_TEXT_SOURCES: usize = 3;

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub const NO_RESULTS_ANSWER: &str = "No relevant customer communications were found for this \
    question. Try widening the date range or removing filters.";

/// Generation context and the results that made it in, in rank order
pub struct BudgetedContext<'a> {
    pub text: String,
    pub included: Vec<&'a RetrievalResult>,
}

/// Concatenate results in rank order. Each document is cut to
/// `max_doc_chars`; inclusion stops at the first document that would push
/// the total past `max_context_chars`.
pub fn build_context(
    results: &[RetrievalResult],
    max_doc_chars: usize,
    max_context_chars: usize,
) -> BudgetedContext<'_> {
    let mut text = String::new();
    let mut total = 0usize;
    let mut included = Vec::new();

    for result in results {
        let entry = context_entry(included.len() + 1, result, max_doc_chars);
        let separator = if included.is_empty() { 0 } else { CONTEXT_SEPARATOR.len() };
        let cost = separator + entry.chars().count();
        if total + cost > max_context_chars {
            tracing::debug!(
                "Context budget reached after {} of {} documents ({} chars)",
                included.len(),
                results.len(),
                total
            );
            break;
        }
        if separator > 0 {
            text.push_str(CONTEXT_SEPARATOR);
        }
        text.push_str(&entry);
        total += cost;
        included.push(result);
    }

    BudgetedContext { text, included }
}

fn context_entry(rank: usize, result: &RetrievalResult, max_doc_chars: usize) -> String {
    let doc = &result.document;
    let meta = &doc.metadata;
    let mut labels: Vec<String> = Vec::new();
    if let Some(channel) = &meta.channel {
        labels.push(channel.clone());
    }
    if let Some(ts) = meta.timestamp {
        labels.push(ts.format("%Y-%m-%d").to_string());
    }
    if let Some(sentiment) = &meta.sentiment {
        labels.push(format!("sentiment: {}", sentiment));
    }
    if let Some(customer) = meta.customer_name.as_ref().or(meta.customer_id.as_ref()) {
        labels.push(format!("customer: {}", customer));
    }

    let header = if labels.is_empty() {
        format!("[{}] Document {}", rank, doc.id)
    } else {
        format!("[{}] Document {} ({})", rank, doc.id, labels.join(", "))
    };
    let body: String = doc.content.chars().take(max_doc_chars).collect();
    format!("{}\n{}", header, body)
}

/// Answer text, confidence and cited sources
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<Source>,
}

/// Interpret a generation response.
///
/// JSON carrying `answer` is used as-is, with confidence clamped to [0, 1]
/// and citations resolved against `included`. Anything else becomes a
/// plain-text answer citing the top included documents.
pub fn parse_answer(response: &str, included: &[&RetrievalResult]) -> GeneratedAnswer {
    if let Some(json) = parse_json_object(response) {
        if let Some(answer) = str_field(&json, "answer") {
            return GeneratedAnswer {
                answer,
                confidence: clamp_confidence(f64_field(&json, "confidence")),
                sources: cited_sources(&json, included),
            };
        }
        tracing::debug!("Generation JSON has no answer field, using raw text");
    }

    GeneratedAnswer {
        answer: response.trim().to_string(),
        confidence: PLAIN_TEXT_CONFIDENCE,
        sources: top_sources(included),
    }
}

/// Extractive stand-in when the model could not be reached
pub fn fallback_answer(included: &[&RetrievalResult]) -> GeneratedAnswer {
    let sources = top_sources(included);
    let mut answer = String::from(
        "An answer could not be generated. The most relevant communications found were:",
    );
    for (i, source) in sources.iter().enumerate() {
        answer.push_str(&format!("\n{}. [{}] {}", i + 1, source.document_id, source.excerpt));
    }

    GeneratedAnswer {
        answer,
        confidence: GENERATION_FAILED_CONFIDENCE,
        sources,
    }
}

/// Finite values clamp into [0, 1]; missing or non-finite use the default
pub fn clamp_confidence(value: Option<f64>) -> f64 {
    match value {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

fn cited_sources(json: &Value, included: &[&RetrievalResult]) -> Vec<Source> {
    let Some(cited) = json.get("sources").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut sources: Vec<Source> = Vec::new();
    for item in cited {
        let Some(id) = str_field(item, "documentId").or_else(|| str_field(item, "id")) else {
            continue;
        };
        if sources.iter().any(|s| s.document_id == id) {
            continue;
        }
        match included.iter().find(|r| r.document.id == id) {
            Some(result) => {
                let mut source = source_for(result);
                source.note = str_field(item, "relevance");
                sources.push(source);
            }
            None => tracing::debug!("Answer cites unknown document {}", id),
        }
    }
    sources
}

fn top_sources(included: &[&RetrievalResult]) -> Vec<Source> {
    included
        .iter()
        .take(PLAIN_TEXT_SOURCES)
        .map(|r| source_for(r))
        .collect()
}

pub fn source_for(result: &RetrievalResult) -> Source {
    Source {
        document_id: result.document.id.clone(),
        relevance: result.rerank_score.unwrap_or(result.score),
        excerpt: excerpt(&result.document.content),
        note: None,
    }
}

/// Whitespace-collapsed text clamped to [`EXCERPT_CHARS`]
pub fn excerpt(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, EXCERPT_CHARS)
}
