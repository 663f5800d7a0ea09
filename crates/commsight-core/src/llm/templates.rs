//! Named prompt templates with `{{variable}}` substitution

use crate::error::{CommsightError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*\}\}").unwrap();
}

pub const QUERY_ENHANCEMENT: &str = "query-enhancement";
pub const CHUNK_CONTEXT: &str = "chunk-context";
pub const RAG_ANSWER: &str = "rag-answer";
pub const CUSTOMER_SUMMARY: &str = "customer-summary";
pub const RESEARCH_FORMAT: &str = "research-format";
pub const INSIGHT_CARD: &str = "insight-card";
pub const TREND_ANALYSIS: &str = "trend-analysis";

/// Prompt template collaborator
pub trait PromptTemplates: Send + Sync {
    /// Raw template text
    fn get_template(&self, name: &str) -> Option<String>;

    /// Render a template; placeholders without a value render empty
    fn render_named(&self, name: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .get_template(name)
            .ok_or_else(|| CommsightError::InvalidInput(format!("Unknown template: {}", name)))?;
        Ok(render(&template, vars))
    }
}

/// Substitute `{{name}}` placeholders in a single pass
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Templates compiled into the binary, optionally overridden per name
#[derive(Debug, Clone, Default)]
pub struct BuiltinTemplates {
    overrides: HashMap<String, String>,
}

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one template by name
    pub fn with_override(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), template.into());
        self
    }
}

impl PromptTemplates for BuiltinTemplates {
    fn get_template(&self, name: &str) -> Option<String> {
        if let Some(custom) = self.overrides.get(name) {
            return Some(custom.clone());
        }
        builtin(name).map(str::to_string)
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    let template = match name {
        QUERY_ENHANCEMENT => QUERY_ENHANCEMENT_TEMPLATE,
        CHUNK_CONTEXT => CHUNK_CONTEXT_TEMPLATE,
        RAG_ANSWER => RAG_ANSWER_TEMPLATE,
        CUSTOMER_SUMMARY => CUSTOMER_SUMMARY_TEMPLATE,
        RESEARCH_FORMAT => RESEARCH_FORMAT_TEMPLATE,
        INSIGHT_CARD => INSIGHT_CARD_TEMPLATE,
        TREND_ANALYSIS => TREND_ANALYSIS_TEMPLATE,
        _ => return None,
    };
    Some(template)
}

const QUERY_ENHANCEMENT_TEMPLATE: &str = r#"Rewrite this analytics question into search-ready queries.

Question: "{{query}}"
Time range: {{time_range}}
Customer context: {{customer_context}}
Active filters: {{filters}}

Output ONLY JSON with these fields:
- originalIntent: one sentence describing what the user wants to learn
- enhancedQueries: array of {"query": string, "purpose": string, "weight": 0.0-1.0}, best query first
- suggestedFilters: object with optional channels, sentiments, tags arrays
- keyTerms: array of important terms
- synonymExpansion: object mapping a term to an array of synonyms
- subQuestions: array of simpler questions that together answer the question
- analysisHints: array of short hints for the analyst

JSON:"#;

const CHUNK_CONTEXT_TEMPLATE: &str = r#"<chunk>
{{chunk}}
</chunk>

Write a short context (2-3 sentences) that situates this chunk within the document above, naming the customer, channel and topic where known. Answer only with the context."#;

const RAG_ANSWER_TEMPLATE: &str = r#"Answer the question using ONLY the customer communications below.

QUESTION:
{{query}}

COMMUNICATIONS:
{{context}}

Rules:
- If the evidence is insufficient, say what is missing.
- Do not invent numbers or facts.
- Cite documents by their id.

Output JSON:
{"answer": string, "confidence": 0.0-1.0, "sources": [{"documentId": string, "relevance": string}]}

JSON:"#;

const CUSTOMER_SUMMARY_TEMPLATE: &str = r#"Summarize the recent communications with customer {{customer_name}}.

{{communications}}

Write a narrative summary covering main topics, overall sentiment, unresolved issues and recommended next steps."#;

const RESEARCH_FORMAT_TEMPLATE: &str = r#"Organize these research findings for the question below.

QUESTION: {{question}}

FINDINGS:
{{findings}}

Output JSON:
{"summary": string, "keyFindings": [{"finding": string, "evidence": string, "confidence": 0.0-1.0}], "recommendations": [string], "limitations": [string], "followUpQuestions": [string]}

JSON:"#;

const INSIGHT_CARD_TEMPLATE: &str = r#"Turn this finding into a dashboard insight card.

TOPIC: {{topic}}

FINDING:
{{finding}}

Output JSON:
{"title": string, "headline": string, "insights": [{"label": string, "value": string, "trend": "up"|"down"|"flat"}], "severity": "info"|"warning"|"critical", "actionItems": [string]}

JSON:"#;

const TREND_ANALYSIS_TEMPLATE: &str = r#"Analyze this {{granularity}} time series for {{metric}}.

DATA:
{{data}}

Output JSON:
{"direction": "increasing"|"decreasing"|"stable"|"volatile", "changePercent": number, "summary": string, "anomalies": [{"period": string, "description": string}], "drivers": [string], "forecast": string}

JSON:"#;
