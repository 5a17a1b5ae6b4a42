//! Unified error types for swarmguard

use thiserror::Error;

/// Unified error type for all swarmguard operations
#[derive(Error, Debug)]
pub enum SwarmError {
    // LLM API errors
    #[error("API error: {0}")]
    Api(String),

    #[error("API limit reached: {0}")]
    ApiLimit(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // Agent errors
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    // Tool call errors
    #[error("Tool call failed: {0}")]
    ToolCall(String),

    #[error("Path validation failed: {0}")]
    PathValidation(String),

    // Loop breaker errors
    #[error("Loop breaker error: {0}")]
    LoopBreaker(String),

    // Configuration and plans
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Plan error: {0}")]
    Plan(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl SwarmError {
    /// Whether the error is a transient API condition (rate limit, open circuit)
    pub fn is_transient(&self) -> bool {
        matches!(self, SwarmError::ApiLimit(_))
    }
}

/// Result type alias using SwarmError
pub type Result<T> = std::result::Result<T, SwarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(SwarmError::ApiLimit("429".to_string()).is_transient());
        assert!(!SwarmError::Api("400".to_string()).is_transient());
        assert!(!SwarmError::ToolCall("boom".to_string()).is_transient());
    }

    #[test]
    fn test_display_prefixes() {
        let err = SwarmError::PathValidation("../etc".to_string());
        assert_eq!(err.to_string(), "Path validation failed: ../etc");
    }
}
