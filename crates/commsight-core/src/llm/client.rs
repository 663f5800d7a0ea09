//! HTTP client for external LLM services (vLLM, OpenAI, etc.)

use super::rate_limit::RateLimiter;
use crate::config::{LLMServiceConfig, DEFAULT_BUCKET_CONCURRENCY};
use crate::error::{CommsightError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{atomic::AtomicU64, Arc};
use std::time::{Duration, Instant};

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Single-turn prompt with an optional system prompt
    async fn prompt(
        &self,
        text: &str,
        system_prompt: Option<&str>,
        options: &CallOptions,
    ) -> Result<String> {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(text)],
            system_blocks: system_prompt
                .map(|s| vec![SystemBlock::plain(s)])
                .unwrap_or_default(),
            ..Default::default()
        };
        Ok(self.complete(request, options).await?.content)
    }

    /// Multi-message completion with optional cacheable system blocks
    async fn complete(&self, request: CompletionRequest, options: &CallOptions)
        -> Result<Completion>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// System context block; `cache` marks it for reuse across nearby calls
#[derive(Debug, Clone, PartialEq)]
pub struct SystemBlock {
    pub text: String,
    pub cache: bool,
}

impl SystemBlock {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache: false,
        }
    }

    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache: true,
        }
    }
}

/// Completion request; unset fields fall back to client defaults
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub system_blocks: Vec<SystemBlock>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Completion result
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Named bucket bounding concurrent calls
    pub rate_limit_key: Option<String>,
}

impl CallOptions {
    pub fn bucket(key: impl Into<String>) -> Self {
        Self {
            rate_limit_key: Some(key.into()),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub cached_blocks_sent: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cached_blocks_sent: u64,
    pub avg_latency_ms: f64,
}

/// vLLM/OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<APIMetrics>,
}

impl VLLMClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        Self::with_rate_limits(config, HashMap::new())
    }

    /// Create a client whose buckets use the given concurrency limits
    pub fn with_rate_limits(
        config: LLMServiceConfig,
        limits: HashMap<String, usize>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CommsightError::Http)?;

        Ok(Self {
            http_client,
            config,
            rate_limiter: Arc::new(RateLimiter::new(limits, DEFAULT_BUCKET_CONCURRENCY)),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        use std::sync::atomic::Ordering;

        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            cached_blocks_sent: self.metrics.cached_blocks_sent.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn record_error(&self) {
        use std::sync::atomic::Ordering;
        self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: ChatMessage,
}

/// Render system blocks and messages into the OpenAI-compatible wire shape
fn wire_messages(request: &CompletionRequest) -> Vec<serde_json::Value> {
    let mut out = Vec::with_capacity(request.system_blocks.len() + request.messages.len());

    for block in &request.system_blocks {
        if block.cache {
            out.push(serde_json::json!({
                "role": "system",
                "content": [{
                    "type": "text",
                    "text": block.text,
                    "cache_control": {"type": "ephemeral"}
                }]
            }));
        } else {
            out.push(serde_json::json!({"role": "system", "content": block.text}));
        }
    }

    for message in &request.messages {
        out.push(serde_json::json!({"role": message.role, "content": message.content}));
    }

    out
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        options: &CallOptions,
    ) -> Result<Completion> {
        use std::sync::atomic::Ordering;

        let _permit = match options.rate_limit_key.as_deref() {
            Some(key) => Some(self.rate_limiter.acquire(key).await?),
            None => None,
        };

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);
        let cached = request.system_blocks.iter().filter(|b| b.cache).count() as u64;
        self.metrics
            .cached_blocks_sent
            .fetch_add(cached, Ordering::Relaxed);

        let wire = WireRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: wire_messages(&request),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let mut req = self.http_client.post(&url).json(&wire);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| {
            self.record_error();
            CommsightError::Http(e)
        })?;

        if !response.status().is_success() {
            self.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CommsightError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: WireResponse = response.json().await.map_err(|e| {
            self.record_error();
            CommsightError::Http(e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.record_error();
                CommsightError::Llm("No response from LLM".to_string())
            })?
            .message
            .content;

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
        tracing::debug!(
            "LLM completion in {}ms ({} chars, bucket {:?})",
            elapsed,
            content.len(),
            options.rate_limit_key
        );

        Ok(Completion { content })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LLMServiceConfig {
        LLMServiceConfig {
            url: server.uri(),
            model: "test-model".to_string(),
            api_key: Some("secret".to_string()),
            timeout_secs: 5,
            max_tokens: 256,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_wire_messages_marks_cached_blocks() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            system_blocks: vec![SystemBlock::plain("rules"), SystemBlock::cached("big doc")],
            ..Default::default()
        };
        let wire = wire_messages(&request);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0]["content"], "rules");
        assert_eq!(wire[1]["content"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(wire[2]["role"], "user");
    }

    #[tokio::test]
    async fn test_complete_posts_openai_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let client = VLLMClient::new(config_for(&server)).unwrap();
        let answer = client
            .prompt("ping", Some("be brief"), &CallOptions::bucket("test"))
            .await
            .unwrap();

        assert_eq!(answer, "hello");
        assert_eq!(client.metrics().total_requests, 1);
        assert_eq!(client.metrics().total_errors, 0);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = VLLMClient::new(config_for(&server)).unwrap();
        let err = client
            .prompt("ping", None, &CallOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("503"));
        assert_eq!(client.metrics().total_errors, 1);
    }

    #[tokio::test]
    async fn test_empty_choices_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = VLLMClient::new(config_for(&server)).unwrap();
        let err = client
            .prompt("ping", None, &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommsightError::Llm(_)));
    }
}
