//! Anthropic Messages API client
//!
//! Each call is a fresh, single-turn conversation: the agent's role as the
//! system prompt, the task prompt as the only user message, and the tool
//! definitions. No history is carried between attempts; anything the next
//! attempt needs to know is put into its prompt by the orchestrator.

use crate::auth;
use crate::circuit_breaker::CircuitBreaker;
use crate::llm::LlmClient;
use crate::types::{
    AgentRequest, AgentResponse, AnthropicMessage, AnthropicRequest, AnthropicResponse, Model,
    ToolDefinition,
};
use async_trait::async_trait;
use std::sync::OnceLock;
use std::time::Duration;
use swarmguard_core::{Result, SwarmError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 8000;
const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

// Rate limit retry configuration
const MAX_RETRIES: u32 = 5;
const INITIAL_BACKOFF_SECS: u64 = 30;
const MAX_BACKOFF_SECS: u64 = 300;

// Shared across all clients in the process
static CIRCUIT_BREAKER: OnceLock<CircuitBreaker> = OnceLock::new();

fn get_circuit_breaker() -> &'static CircuitBreaker {
    CIRCUIT_BREAKER.get_or_init(CircuitBreaker::default)
}

/// Client for the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    model: Model,
    max_tokens: usize,
    api_key_env: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    /// Create a new client for a model
    pub fn new(model: Model) -> Self {
        Self {
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Set max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Read the API key from a different environment variable
    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = env.into();
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    fn build_request(&self, request: &AgentRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.api_name().to_string(),
            max_tokens: self.max_tokens,
            system: Some(request.system.clone()).filter(|s| !s.is_empty()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            tools: ToolDefinition::all(),
        }
    }

    async fn send(&self, request: &AgentRequest) -> Result<AgentResponse> {
        let circuit_breaker = get_circuit_breaker();

        if !circuit_breaker.can_execute() {
            return Err(SwarmError::ApiLimit(format!(
                "Circuit breaker is OPEN after repeated API failures. Wait {} seconds before retry.",
                circuit_breaker.time_until_retry() / 1000
            )));
        }

        let auth_token = auth::get_auth_token(&self.api_key_env)?;
        let body = self.build_request(request);

        let mut retries = 0;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            tracing::debug!(
                "Sending request for {} attempt {} (http try {})",
                request.agent,
                request.attempt,
                retries + 1
            );

            let response = self
                .http
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &auth_token)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        SwarmError::Api(format!("Request timed out: {}", e))
                    } else {
                        SwarmError::Api(format!("Failed to send request: {}", e))
                    }
                })?;

            let status = response.status();

            if status.as_u16() == 429 {
                retries += 1;

                if retries > MAX_RETRIES {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown".to_string());
                    return Err(SwarmError::ApiLimit(format!(
                        "Rate limit exceeded after {} retries. Last error: {}",
                        MAX_RETRIES, error_text
                    )));
                }

                let wait_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(backoff_secs);

                tracing::warn!(
                    "Rate limited (429). Waiting {} seconds before retry {}/{}",
                    wait_secs,
                    retries,
                    MAX_RETRIES
                );

                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());

                if status.is_server_error() && retries < MAX_RETRIES {
                    retries += 1;
                    tracing::warn!(
                        "Server error ({}). Waiting {} seconds before retry {}/{}",
                        status,
                        backoff_secs,
                        retries,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                circuit_breaker.record_failure();
                tracing::error!(
                    "Circuit breaker: recorded failure (count: {})",
                    circuit_breaker.failure_count()
                );

                return Err(SwarmError::Api(format!(
                    "Anthropic API error {}: {}",
                    status, error_text
                )));
            }

            let parsed: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| SwarmError::Api(format!("Failed to parse response: {}", e)))?;

            circuit_breaker.record_success();

            let agent_response = AgentResponse::from(parsed);

            match &agent_response.usage {
                Some(usage) => tracing::info!(
                    "{} attempt {} answered ({} tool calls, {} input tokens, {} output tokens)",
                    request.agent,
                    request.attempt,
                    agent_response.tool_calls.len(),
                    usage.input_tokens,
                    usage.output_tokens
                ),
                None => tracing::info!(
                    "{} attempt {} answered ({} tool calls)",
                    request.agent,
                    request.attempt,
                    agent_response.tool_calls.len()
                ),
            }

            return Ok(agent_response);
        }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new(Model::default())
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &AgentRequest) -> Result<AgentResponse> {
        self.send(request).await
    }

    fn label(&self) -> String {
        format!("anthropic:{}", self.model)
    }
}
