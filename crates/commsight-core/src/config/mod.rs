//! Configuration management

use crate::error::{CommsightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Hybrid search service configuration
    #[serde(default)]
    pub search_service: SearchServiceConfig,

    /// Cross-encoder rerank service configuration
    #[serde(default)]
    pub rerank_service: RerankServiceConfig,

    /// RAG orchestration settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Query enhancement settings
    #[serde(default)]
    pub enhancer: EnhancerConfig,

    /// Contextual chunking settings
    #[serde(default)]
    pub chunker: ChunkerConfig,

    /// Response formatting settings
    #[serde(default)]
    pub formatter: FormatterConfig,

    /// Max concurrent LLM calls per rate-limit bucket
    #[serde(default)]
    pub rate_limits: HashMap<String, usize>,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the OpenAI-compatible chat service
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Default completion budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Default sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("COMMSIGHT_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            api_key: std::env::var("COMMSIGHT_LLM_API_KEY").ok(),
            timeout_secs: default_http_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("COMMSIGHT_LLM_MODEL")
        .unwrap_or_else(|_| "mistralai/Mistral-7B-Instruct-v0.2".to_string())
}

fn default_http_timeout() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

/// Hybrid search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchServiceConfig {
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("COMMSIGHT_SEARCH_URL")
                .unwrap_or_else(|_| "http://localhost:9200".to_string()),
            api_key: std::env::var("COMMSIGHT_SEARCH_API_KEY").ok(),
            timeout_secs: default_service_timeout(),
        }
    }
}

/// Rerank service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankServiceConfig {
    pub url: String,

    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("COMMSIGHT_RERANK_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout_secs: default_service_timeout(),
        }
    }
}

fn default_service_timeout() -> u64 {
    30
}

/// RAG orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub default_top_k: usize,
    pub rerank_top_k: usize,
    /// Largest top-k a caller may request
    pub max_top_k: usize,
    /// Retrieval hits scoring below this are dropped
    pub min_score: f64,
    pub max_doc_chars: usize,
    pub max_context_chars: usize,
    pub generation_timeout_secs: u64,
    /// Communications pulled for a customer summary
    pub customer_summary_batch: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            rerank_top_k: 5,
            max_top_k: 100,
            min_score: 0.0,
            max_doc_chars: 4000,
            max_context_chars: 50_000,
            generation_timeout_secs: 60,
            customer_summary_batch: 50,
        }
    }
}

impl RagConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Resolve a caller-supplied top-k against the default and `max_top_k`
    pub fn resolve_top_k(&self, requested: Option<usize>, default: usize) -> Result<usize> {
        let top_k = requested.unwrap_or(default).max(1);
        if top_k > self.max_top_k {
            return Err(CommsightError::InvalidInput(format!(
                "top-k {} exceeds the maximum of {}",
                top_k, self.max_top_k
            )));
        }
        Ok(top_k)
    }
}

/// Query enhancement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub rate_limit_key: String,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            cache_ttl_secs: 3600,
            rate_limit_key: "query-enhancement".to_string(),
        }
    }
}

impl EnhancerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Contextual chunking settings
///
/// `chunk_size`, `overlap` and `min_chunk_size` are UTF-8 byte counts; chunk
/// boundaries are snapped to char boundaries. `max_prefix_chars` counts chars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Window size in bytes
    pub chunk_size: usize,
    /// Bytes shared between adjacent windows
    pub overlap: usize,
    /// Trimmed chunks shorter than this many bytes are dropped
    pub min_chunk_size: usize,
    /// Chunks contextualized concurrently per batch
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub max_prefix_chars: usize,
    pub rate_limit_key: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            min_chunk_size: 100,
            batch_size: 5,
            timeout_secs: 60,
            max_prefix_chars: 300,
            rate_limit_key: "contextual-chunking".to_string(),
        }
    }
}

impl ChunkerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject settings under which the splitter cannot make progress
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CommsightError::Config("chunk_size must be positive".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(CommsightError::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.min_chunk_size > self.chunk_size {
            return Err(CommsightError::Config(format!(
                "min_chunk_size ({}) exceeds chunk_size ({})",
                self.min_chunk_size, self.chunk_size
            )));
        }
        if self.batch_size == 0 {
            return Err(CommsightError::Config("batch_size must be positive".into()));
        }
        Ok(())
    }
}

/// Response formatting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    pub timeout_secs: u64,
    pub rate_limit_key: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            rate_limit_key: "response-formatting".to_string(),
        }
    }
}

impl FormatterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default concurrency for a rate-limit bucket with no explicit entry
pub const DEFAULT_BUCKET_CONCURRENCY: usize = 4;

impl Config {
    /// Load config from `COMMSIGHT_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("COMMSIGHT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        Self::load_from(&path)
    }

    /// Load config from an explicit path, defaults if the file is absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    pub fn validate(&self) -> Result<()> {
        self.chunker.validate()?;
        if self.rag.default_top_k == 0 || self.rag.rerank_top_k == 0 {
            return Err(CommsightError::Config("top-k values must be positive".into()));
        }
        if self.rag.default_top_k > self.rag.max_top_k
            || self.rag.rerank_top_k > self.rag.max_top_k
        {
            return Err(CommsightError::Config(format!(
                "default top-k values must not exceed max_top_k ({})",
                self.rag.max_top_k
            )));
        }
        if self.rate_limits.values().any(|&n| n == 0) {
            return Err(CommsightError::Config(
                "rate limit buckets need at least one slot".into(),
            ));
        }
        Ok(())
    }
}
