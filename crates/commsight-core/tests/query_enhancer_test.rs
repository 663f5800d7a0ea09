//! Query enhancer caching, fallback and deadline behaviour

mod common;

use common::{request_text, ScriptedLLM};
use commsight_core::config::EnhancerConfig;
use commsight_core::llm::{BuiltinTemplates, Cache, InMemoryCache};
use commsight_core::query::{
    build_cache_key, EnhanceOptions, EnhancementSource, QueryEnhancer, CACHE_NAMESPACE,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const ENHANCEMENT_JSON: &str = r#"{
  "originalIntent": "Find overdraft fee complaints",
  "enhancedQueries": [
    {"query": "overdraft fee complaint", "purpose": "direct", "weight": 1.0},
    {"query": "unexpected overdraft charge", "purpose": "paraphrase", "weight": 0.8}
  ],
  "suggestedFilters": {"sentiments": ["negative"]},
  "keyTerms": ["overdraft", "fee"]
}"#;

fn enhancer(llm: Arc<ScriptedLLM>, cache: Arc<InMemoryCache>) -> QueryEnhancer {
    QueryEnhancer::new(
        llm,
        cache,
        Arc::new(BuiltinTemplates::new()),
        EnhancerConfig::default(),
    )
}

#[tokio::test]
async fn test_second_call_served_from_cache() {
    let llm = Arc::new(ScriptedLLM::replying(ENHANCEMENT_JSON));
    let enhancer = enhancer(llm.clone(), Arc::new(InMemoryCache::new()));
    let options = EnhanceOptions::default();

    let first = enhancer.enhance_detailed("Overdraft fees", &options).await;
    let second = enhancer.enhance_detailed("  overdraft FEES ", &options).await;

    assert_eq!(first.source, EnhancementSource::Llm);
    assert_eq!(second.source, EnhancementSource::Cache);
    assert_eq!(first.enhanced, second.enhanced);
    assert_eq!(llm.calls(), 1);
    assert_eq!(second.enhanced.primary_query(), Some("overdraft fee complaint"));
    assert_eq!(second.enhanced.suggested_filters.sentiments, vec!["negative"]);
}

#[tokio::test]
async fn test_skip_cache_always_calls_llm() {
    let llm = Arc::new(ScriptedLLM::replying(ENHANCEMENT_JSON));
    let cache = Arc::new(InMemoryCache::new());
    let enhancer = enhancer(llm.clone(), cache.clone());
    let options = EnhanceOptions {
        skip_cache: true,
        ..Default::default()
    };

    enhancer.enhance("overdraft fees", &options).await;
    enhancer.enhance("overdraft fees", &options).await;

    assert_eq!(llm.calls(), 2);
    let key = build_cache_key("overdraft fees", &options);
    assert!(cache.get(&key).await.is_none());
}

#[tokio::test]
async fn test_options_reach_the_prompt() {
    let llm = Arc::new(ScriptedLLM::replying(ENHANCEMENT_JSON));
    let enhancer = enhancer(llm.clone(), Arc::new(InMemoryCache::new()));
    let options = EnhanceOptions {
        time_range: Some("from Jan 1, 2024 to Mar 1, 2024".to_string()),
        customer_context: Some("premium account holder".to_string()),
        ..Default::default()
    };

    enhancer.enhance("overdraft fees", &options).await;

    let requests = llm.requests.lock().unwrap();
    let text = request_text(&requests[0]);
    assert!(text.contains("overdraft fees"));
    assert!(text.contains("from Jan 1, 2024 to Mar 1, 2024"));
    assert!(text.contains("premium account holder"));
    let buckets = llm.buckets.lock().unwrap();
    assert_eq!(buckets[0].as_deref(), Some("query-enhancement"));
}

#[tokio::test]
async fn test_llm_failure_uses_synonym_fallback() {
    let llm = Arc::new(ScriptedLLM::failing("service unavailable"));
    let cache = Arc::new(InMemoryCache::new());
    let enhancer = enhancer(llm, cache.clone());
    let options = EnhanceOptions::default();

    let outcome = enhancer.enhance_detailed("refund delay", &options).await;

    match &outcome.source {
        EnhancementSource::Fallback { reason } => assert!(reason.contains("service unavailable")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(outcome.enhanced.primary_query(), Some("refund delay"));
    assert!(outcome.enhanced.enhanced_queries.len() > 1);
    assert!(outcome.enhanced.key_terms.contains("refund"));
    // fallbacks are not cached
    assert!(cache.get(&build_cache_key("refund delay", &options)).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_llm_times_out_to_fallback() {
    let llm = Arc::new(ScriptedLLM::replying(ENHANCEMENT_JSON).with_delay(Duration::from_secs(120)));
    let enhancer = enhancer(llm, Arc::new(InMemoryCache::new()));

    let outcome = enhancer
        .enhance_detailed("card declined", &EnhanceOptions::default())
        .await;

    match outcome.source {
        EnhancementSource::Fallback { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected timeout fallback, got {:?}", other),
    }
    assert_eq!(outcome.enhanced.primary_query(), Some("card declined"));
}

#[tokio::test]
async fn test_unparseable_response_keeps_original_query() {
    let llm = Arc::new(ScriptedLLM::replying("Sorry, I can't help with that."));
    let enhancer = enhancer(llm, Arc::new(InMemoryCache::new()));

    let outcome = enhancer
        .enhance_detailed("fraud alerts", &EnhanceOptions::default())
        .await;

    assert_eq!(outcome.source, EnhancementSource::Llm);
    assert_eq!(outcome.enhanced.primary_query(), Some("fraud alerts"));
    assert_eq!(outcome.enhanced.original_intent, "fraud alerts");
}

proptest! {
    #[test]
    fn prop_cache_key_deterministic(
        query in "[a-zA-Z ]{1,40}",
        time_range in proptest::option::of("[a-z0-9 ]{1,20}"),
        customer in proptest::option::of("[a-z]{1,10}"),
    ) {
        let options = EnhanceOptions {
            time_range,
            customer_context: customer,
            ..Default::default()
        };
        let key = build_cache_key(&query, &options);
        prop_assert_eq!(&key, &build_cache_key(&query, &options.clone()));
        prop_assert_eq!(&key, &build_cache_key(&format!("  {}  ", query.to_uppercase()), &options));
        let prefix = format!("{}:", CACHE_NAMESPACE);
        prop_assert!(key.starts_with(&prefix));
        prop_assert_eq!(key.len(), prefix.len() + 32);
    }
}
