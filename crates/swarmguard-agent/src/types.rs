//! Request/response types for agent interactions

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use swarmguard_core::{ToolCall, ToolKind};

/// Claude model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Opus,
    #[default]
    Sonnet,
    Haiku,
}

impl Model {
    /// Get the API model name
    pub fn api_name(&self) -> &'static str {
        match self {
            Model::Opus => "claude-opus-4-20250514",
            Model::Sonnet => "claude-sonnet-4-5-20250929",
            Model::Haiku => "claude-3-5-haiku-20241022",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::Opus => write!(f, "opus"),
            Model::Sonnet => write!(f, "sonnet"),
            Model::Haiku => write!(f, "haiku"),
        }
    }
}

impl std::str::FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opus" => Ok(Model::Opus),
            "sonnet" => Ok(Model::Sonnet),
            "haiku" => Ok(Model::Haiku),
            _ => Err(format!("Invalid model: {}. Use opus, sonnet, or haiku.", s)),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Usage {
    /// Accumulate another usage record
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// One agent attempt, as handed to an [`LlmClient`](crate::LlmClient)
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Agent name (for logging and mock matching)
    pub agent: String,
    /// Role prompt
    pub system: String,
    /// Task prompt, including any recovery instruction
    pub prompt: String,
    /// 1-based attempt number for this task
    pub attempt: usize,
}

/// What came back from one agent attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Concatenated text blocks
    pub text: String,
    /// Tool calls in the order emitted
    pub tool_calls: Vec<ToolCall>,
    /// Token usage if reported
    pub usage: Option<Usage>,
    /// Provider stop reason (`end_turn`, `tool_use`, `max_tokens`, ...)
    pub stop_reason: Option<String>,
}

impl AgentResponse {
    /// A text-only response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A response made of tool calls only
    pub fn tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            stop_reason: Some("tool_use".to_string()),
            ..Self::default()
        }
    }

    /// Whether the model ran out of output tokens
    pub fn was_truncated(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

/// Anthropic API message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// JSON schema for a known tool: every required field is a string
    pub fn for_kind(kind: ToolKind) -> Self {
        let mut properties = Map::new();
        for field in kind.required_fields() {
            properties.insert(field.to_string(), json!({ "type": "string" }));
        }
        Self {
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": kind.required_fields(),
            }),
        }
    }

    /// Definitions for every known tool
    pub fn all() -> Vec<Self> {
        ToolKind::ALL.into_iter().map(Self::for_kind).collect()
    }
}

/// Anthropic API request format
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// Anthropic API response format
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
    #[allow(dead_code)]
    pub id: String,
    pub content: Vec<AnthropicContent>,
    pub usage: Option<Usage>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Content block in Anthropic response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl From<AnthropicResponse> for AgentResponse {
    fn from(response: AnthropicResponse) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                AnthropicContent::Text { text: t } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&t);
                }
                AnthropicContent::ToolUse { id, name, input } => {
                    // A non-object input is treated as "no parameters"; the
                    // interceptor fills in whatever is required.
                    let input = match input {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    tool_calls.push(ToolCall::new(id, name, input));
                }
                AnthropicContent::Other => {}
            }
        }

        Self {
            text,
            tool_calls,
            usage: response.usage,
            stop_reason: response.stop_reason,
        }
    }
}
