//! LLM integration
//!
//! Provides:
//! - The `LLMClient` collaborator trait and an OpenAI-compatible HTTP client
//! - A TTL cache collaborator
//! - Deadline and rate-limit primitives for outbound calls
//! - Brace-matching JSON extraction for model output
//! - Named prompt templates

mod cache;
mod client;
mod deadline;
mod json;
mod rate_limit;
pub mod templates;

pub use cache::{cache_get_json, cache_set_json, Cache, CacheStats, InMemoryCache};
pub use client::{
    APIMetrics, CallOptions, ChatMessage, Completion, CompletionRequest, LLMClient,
    MetricsSnapshot, SystemBlock, VLLMClient,
};
pub use deadline::with_deadline;
pub use json::{extract_json_object, f64_field, parse_json_object, str_field, string_list};
pub use rate_limit::RateLimiter;
pub use templates::{BuiltinTemplates, PromptTemplates};
