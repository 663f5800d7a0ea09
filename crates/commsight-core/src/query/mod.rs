//! Query enhancement
//!
//! Rewrites raw analyst questions into weighted search queries, suggested
//! filters and key terms. Falls back to synonym expansion when the LLM path
//! fails.

mod decompose;
mod enhancer;
mod synonyms;

pub use decompose::decompose;
pub use enhancer::{
    basic_enhancement, build_cache_key, extract_key_terms, EnhanceOptions, EnhancedQuery,
    EnhancementOutcome, EnhancementSource, QueryEnhancer, WeightedQuery, CACHE_NAMESPACE,
};
pub use synonyms::{expand_with_synonyms, synonym_map, synonyms_for};
