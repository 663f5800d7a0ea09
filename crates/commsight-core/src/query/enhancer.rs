//! LLM query enhancement with caching and a deterministic fallback

use super::decompose::decompose;
use super::synonyms::{expand_with_synonyms, normalize_token, synonym_map};
use crate::config::EnhancerConfig;
use crate::error::Result;
use crate::llm::{
    cache_get_json, cache_set_json, f64_field, parse_json_object, str_field, string_list,
    templates, with_deadline, Cache, CallOptions, LLMClient, PromptTemplates,
};
use crate::search::SearchFilters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Namespace tag for enhancement cache keys
pub const CACHE_NAMESPACE: &str = "query-enhancement";

const ENHANCEMENT_SYSTEM_PROMPT: &str = "You are a search strategist for a bank's customer \
    communications analytics team. You rewrite analyst questions into precise search queries \
    over emails, call transcripts, chats and social posts. Output ONLY valid JSON.";

/// One weighted search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedQuery {
    pub query: String,
    pub purpose: String,
    /// Relative importance in [0, 1]
    pub weight: f64,
}

/// Structured rewrite of a raw query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedQuery {
    pub original_intent: String,
    pub enhanced_queries: Vec<WeightedQuery>,
    pub suggested_filters: SearchFilters,
    pub key_terms: BTreeSet<String>,
    pub synonym_expansion: BTreeMap<String, Vec<String>>,
    pub sub_questions: Vec<String>,
    pub analysis_hints: Vec<String>,
}

impl EnhancedQuery {
    /// Best query to search with
    pub fn primary_query(&self) -> Option<&str> {
        self.enhanced_queries.first().map(|q| q.query.as_str())
    }
}

/// Inputs that shape an enhancement besides the query text
#[derive(Debug, Clone, Default)]
pub struct EnhanceOptions {
    /// Human-readable time range, e.g. "from Jan 1, 2024 to Mar 1, 2024"
    pub time_range: Option<String>,
    pub customer_context: Option<String>,
    /// Filters already applied by the caller, serialized as JSON
    pub selected_filters: Option<String>,
    pub skip_cache: bool,
}

/// Where an enhancement came from
#[derive(Debug, Clone, PartialEq)]
pub enum EnhancementSource {
    Llm,
    Cache,
    /// Synonym heuristic after an LLM failure
    Fallback { reason: String },
}

/// Enhancement plus provenance
#[derive(Debug, Clone)]
pub struct EnhancementOutcome {
    pub enhanced: EnhancedQuery,
    pub source: EnhancementSource,
}

/// Cache key: namespace plus the first 32 hex chars of SHA-256 over a
/// canonical JSON of the normalized inputs. Only `query` is normalized.
pub fn build_cache_key(query: &str, options: &EnhanceOptions) -> String {
    // serde_json maps are key-sorted, so this serialization is canonical
    let canonical = serde_json::json!({
        "query": query.trim().to_lowercase(),
        "timeRange": options.time_range,
        "customerContext": options.customer_context,
        "selectedFilters": options.selected_filters,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

    format!("{}:{}", CACHE_NAMESPACE, &hex[..32])
}

/// Words longer than three characters, lower-cased
pub fn extract_key_terms(query: &str) -> BTreeSet<String> {
    query
        .split_whitespace()
        .map(normalize_token)
        .filter(|w| w.chars().count() > 3)
        .collect()
}

/// Deterministic enhancement used when the LLM path fails
pub fn basic_enhancement(query: &str) -> EnhancedQuery {
    let enhanced_queries = expand_with_synonyms(query)
        .into_iter()
        .enumerate()
        .map(|(i, q)| WeightedQuery {
            query: q,
            purpose: if i == 0 {
                "original query".to_string()
            } else {
                "synonym expansion".to_string()
            },
            weight: if i == 0 { 1.0 } else { 0.7 },
        })
        .collect();

    EnhancedQuery {
        original_intent: query.to_string(),
        enhanced_queries,
        suggested_filters: SearchFilters::default(),
        key_terms: extract_key_terms(query),
        synonym_expansion: synonym_map(query).into_iter().collect(),
        sub_questions: decompose(query),
        analysis_hints: Vec::new(),
    }
}

/// Rewrites raw analyst queries into weighted sub-queries and filters
pub struct QueryEnhancer {
    client: Arc<dyn LLMClient>,
    cache: Arc<dyn Cache>,
    templates: Arc<dyn PromptTemplates>,
    config: EnhancerConfig,
}

impl QueryEnhancer {
    pub fn new(
        client: Arc<dyn LLMClient>,
        cache: Arc<dyn Cache>,
        templates: Arc<dyn PromptTemplates>,
        config: EnhancerConfig,
    ) -> Self {
        Self {
            client,
            cache,
            templates,
            config,
        }
    }

    /// Enhance a query. Never fails: LLM or parse trouble yields the
    /// synonym-based basic enhancement.
    pub async fn enhance(&self, query: &str, options: &EnhanceOptions) -> EnhancedQuery {
        self.enhance_detailed(query, options).await.enhanced
    }

    /// Like [`enhance`](Self::enhance) but reports whether the fallback ran
    pub async fn enhance_detailed(
        &self,
        query: &str,
        options: &EnhanceOptions,
    ) -> EnhancementOutcome {
        let cache_key = build_cache_key(query, options);

        if !options.skip_cache {
            if let Some(cached) =
                cache_get_json::<EnhancedQuery>(self.cache.as_ref(), &cache_key).await
            {
                tracing::info!("Query enhancement cache hit ({})", cache_key);
                return EnhancementOutcome {
                    enhanced: cached,
                    source: EnhancementSource::Cache,
                };
            }
        }

        match self.enhance_with_llm(query, options).await {
            Ok(enhanced) => {
                if !options.skip_cache {
                    cache_set_json(
                        self.cache.as_ref(),
                        &cache_key,
                        &enhanced,
                        self.config.cache_ttl(),
                    )
                    .await;
                }
                EnhancementOutcome {
                    enhanced,
                    source: EnhancementSource::Llm,
                }
            }
            Err(e) => {
                tracing::warn!("Query enhancement failed: {}, using synonym fallback", e);
                EnhancementOutcome {
                    enhanced: basic_enhancement(query),
                    source: EnhancementSource::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    async fn enhance_with_llm(&self, query: &str, options: &EnhanceOptions) -> Result<EnhancedQuery> {
        let prompt = self.templates.render_named(
            templates::QUERY_ENHANCEMENT,
            &[
                ("query", query),
                ("time_range", options.time_range.as_deref().unwrap_or("any time")),
                (
                    "customer_context",
                    options.customer_context.as_deref().unwrap_or("none"),
                ),
                ("filters", options.selected_filters.as_deref().unwrap_or("{}")),
            ],
        )?;

        let call_options = CallOptions::bucket(self.config.rate_limit_key.clone());
        let response = with_deadline(
            "query enhancement",
            self.config.timeout(),
            self.client
                .prompt(&prompt, Some(ENHANCEMENT_SYSTEM_PROMPT), &call_options),
        )
        .await?;

        tracing::debug!("Raw enhancement response: {}", response);
        Ok(parse_enhancement_response(&response, query))
    }

    /// Heuristic decomposition, exposed for callers that skip the LLM
    pub fn decompose(&self, question: &str) -> Vec<String> {
        decompose(question)
    }
}

/// Build an enhancement from model output, defaulting each missing field
fn parse_enhancement_response(response: &str, query: &str) -> EnhancedQuery {
    let parsed = parse_json_object(response).unwrap_or_else(|| {
        tracing::warn!("No JSON object in enhancement response, using field defaults");
        Value::Object(Default::default())
    });

    let mut enhanced_queries: Vec<WeightedQuery> = parsed
        .get("enhancedQueries")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_weighted_query).collect())
        .unwrap_or_default();

    if enhanced_queries.is_empty() {
        enhanced_queries.push(WeightedQuery {
            query: query.to_string(),
            purpose: "original query".to_string(),
            weight: 1.0,
        });
    }

    let suggested_filters = parsed
        .get("suggestedFilters")
        .cloned()
        .and_then(|v| serde_json::from_value::<SearchFilters>(v).ok())
        .unwrap_or_default();

    let synonym_expansion = parsed
        .get("synonymExpansion")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(term, synonyms)| {
                    let list = synonyms
                        .as_array()
                        .map(|arr| {
                            arr.iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    (term.clone(), list)
                })
                .collect()
        })
        .unwrap_or_default();

    EnhancedQuery {
        original_intent: str_field(&parsed, "originalIntent").unwrap_or_else(|| query.to_string()),
        enhanced_queries,
        suggested_filters,
        key_terms: string_list(&parsed, "keyTerms").into_iter().collect(),
        synonym_expansion,
        sub_questions: string_list(&parsed, "subQuestions"),
        analysis_hints: string_list(&parsed, "analysisHints"),
    }
}

fn parse_weighted_query(item: &Value) -> Option<WeightedQuery> {
    let query = str_field(item, "query")?;
    Some(WeightedQuery {
        query,
        purpose: str_field(item, "purpose").unwrap_or_default(),
        weight: f64_field(item, "weight").unwrap_or(1.0).clamp(0.0, 1.0),
    })
}
