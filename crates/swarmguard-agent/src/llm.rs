//! The seam between the orchestrator and whatever answers agent prompts

use crate::types::{AgentRequest, AgentResponse};
use async_trait::async_trait;
use swarmguard_core::Result;

/// Something that can answer one agent attempt
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one stateless request and return the parsed response
    async fn complete(&self, request: &AgentRequest) -> Result<AgentResponse>;

    /// Short label for logs and reports
    fn label(&self) -> String;
}
