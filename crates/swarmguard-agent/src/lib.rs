//! # swarmguard-agent
//!
//! LLM clients for swarmguard agents.
//!
//! Every agent attempt is a single stateless request: a system prompt (the
//! agent's role), a user prompt (task, expected files, and any recovery
//! instruction), and the tool definitions. The response is reduced to text
//! plus a list of [`ToolCall`](swarmguard_core::ToolCall)s.
//!
//! Two implementations of [`LlmClient`]:
//! - [`AnthropicClient`] talks to the Messages API, with a circuit breaker
//!   and rate-limit backoff
//! - [`MockClient`] answers from a keyword-matched script, for offline runs
//!   and tests

mod auth;
mod circuit_breaker;
mod client;
mod llm;
mod mock;
mod types;
mod xml_blocks;

pub use auth::get_auth_token;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::AnthropicClient;
pub use llm::LlmClient;
pub use mock::{MockClient, MockReply};
pub use types::*;
pub use xml_blocks::{parse_write_blocks, structured_output_instructions};
