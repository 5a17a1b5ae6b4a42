//! Scripted stand-in for the LLM
//!
//! Responses are picked by keyword: the first rule whose keyword appears in
//! the prompt (case-insensitive) answers. A rule can be limited to a number
//! of uses, after which later rules get their turn, so a script can express
//! "fail twice, then succeed".

use crate::llm::LlmClient;
use crate::types::{AgentRequest, AgentResponse};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;
use swarmguard_core::{Result, SwarmError, ToolCall, ToolKind};

/// What a mock rule answers with
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A normal response
    Respond(AgentResponse),
    /// A non-retryable API error
    Fail(String),
    /// A rate-limit / open-circuit error
    Limit(String),
}

impl MockReply {
    fn produce(&self) -> Result<AgentResponse> {
        match self {
            Self::Respond(response) => Ok(response.clone()),
            Self::Fail(message) => Err(SwarmError::Api(message.clone())),
            Self::Limit(message) => Err(SwarmError::ApiLimit(message.clone())),
        }
    }
}

#[derive(Debug)]
struct MockRule {
    keyword: String,
    reply: MockReply,
    remaining: Option<usize>,
}

/// Keyword-scripted [`LlmClient`]
#[derive(Debug)]
pub struct MockClient {
    rules: Mutex<Vec<MockRule>>,
    default: MockReply,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    /// A mock that answers everything with `default`
    pub fn new(default: MockReply) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Add a rule that answers every matching prompt
    pub fn with_rule(self, keyword: &str, reply: MockReply) -> Self {
        self.push_rule(keyword, reply, None)
    }

    /// Add a rule that answers the first `times` matching prompts only
    pub fn with_rule_times(self, keyword: &str, reply: MockReply, times: usize) -> Self {
        self.push_rule(keyword, reply, Some(times))
    }

    fn push_rule(self, keyword: &str, reply: MockReply, remaining: Option<usize>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(MockRule {
                keyword: keyword.to_lowercase(),
                reply,
                remaining,
            });
        }
        self
    }

    /// Every prompt received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls answered so far
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    fn answer(&self, prompt: &str) -> Result<AgentResponse> {
        let haystack = prompt.to_lowercase();
        let mut rules = self
            .rules
            .lock()
            .map_err(|_| SwarmError::Other("mock rule table poisoned".to_string()))?;

        for rule in rules.iter_mut() {
            if rule.remaining == Some(0) || !haystack.contains(&rule.keyword) {
                continue;
            }
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            tracing::debug!("Mock rule '{}' matched", rule.keyword);
            return rule.reply.produce();
        }

        self.default.produce()
    }

    /// The builtin offline script for the default plan
    ///
    /// Every builtin agent gets an answer; several are deliberately flawed so
    /// a mock run exercises parameter repair, retries and fallback:
    /// - `requirements-analyst` answers in XML blocks instead of tool calls
    /// - `project-architect` records a decision without a rationale
    /// - `rapid-builder` leaves `requirements.txt` as a TODO placeholder
    /// - `frontend-specialist` omits the content of `app.js`
    /// - `quality-guardian` replies with prose once before doing the work
    /// - `devops-engineer` keeps writing outside the project root
    pub fn scaffolding() -> Self {
        Self::new(MockReply::Respond(AgentResponse::text(
            "I am not sure what to build here.",
        )))
        .with_rule(
            "requirements-analyst",
            MockReply::Respond(AgentResponse::text(
                "Requirements follow.\n\n<write_to_file>\n<path>docs/requirements.md</path>\n<content>\n\
                 # Requirements\n\n- Users can create, list, update and delete items.\n\
                 - The API responds in under 200ms for typical requests.\n</content>\n</write_to_file>\n",
            )),
        )
        .with_rule(
            "project-architect",
            MockReply::Respond(AgentResponse::tools(vec![
                ToolCall::write_file(
                    "arch_1",
                    "docs/architecture.md",
                    "# Architecture\n\nFastAPI backend, static HTML frontend, SQLite storage.\n",
                ),
                ToolCall::write_file(
                    "arch_2",
                    "README.md",
                    "# Project\n\nSee docs/architecture.md for the design.\n",
                ),
                call(
                    "arch_3",
                    ToolKind::RecordDecision,
                    &[("decision", "Use SQLite for local development")],
                ),
            ])),
        )
        .with_rule(
            "rapid-builder",
            MockReply::Respond(AgentResponse::tools(vec![
                ToolCall::write_file(
                    "build_1",
                    "backend/main.py",
                    "from fastapi import FastAPI\n\napp = FastAPI()\n\n\n@app.get(\"/health\")\ndef health():\n    return {\"status\": \"ok\"}\n",
                ),
                ToolCall::write_file(
                    "build_2",
                    "backend/models.py",
                    "from pydantic import BaseModel\n\n\nclass Item(BaseModel):\n    id: int\n    name: str\n",
                ),
                ToolCall::write_file("build_3", "requirements.txt", "TODO"),
            ])),
        )
        .with_rule(
            "frontend-specialist",
            MockReply::Respond(AgentResponse::tools(vec![
                ToolCall::write_file(
                    "fe_1",
                    "frontend/index.html",
                    "<!DOCTYPE html>\n<html>\n<head><link rel=\"stylesheet\" href=\"styles.css\"></head>\n<body><div id=\"app\"></div><script src=\"app.js\"></script></body>\n</html>\n",
                ),
                ToolCall::write_file(
                    "fe_2",
                    "frontend/styles.css",
                    "body {\n  font-family: sans-serif;\n  margin: 2rem;\n}\n",
                ),
                call("fe_3", ToolKind::WriteFile, &[("file_path", "frontend/app.js")]),
            ])),
        )
        .with_rule_times(
            "quality-guardian",
            MockReply::Respond(AgentResponse::text(
                "I will write the tests once the backend settles.",
            )),
            1,
        )
        .with_rule(
            "quality-guardian",
            MockReply::Respond(AgentResponse::tools(vec![ToolCall::write_file(
                "qa_1",
                "tests/test_api.py",
                "from fastapi.testclient import TestClient\n\nfrom backend.main import app\n\n\ndef test_health():\n    client = TestClient(app)\n    assert client.get(\"/health\").json() == {\"status\": \"ok\"}\n",
            )])),
        )
        .with_rule(
            "devops-engineer",
            MockReply::Respond(AgentResponse::tools(vec![ToolCall::write_file(
                "ops_1",
                "../deploy/Dockerfile",
                "FROM python:3.12-slim\n",
            )])),
        )
    }
}

/// Build a tool call from string pairs
fn call(id: &str, kind: ToolKind, params: &[(&str, &str)]) -> ToolCall {
    let input: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    ToolCall::new(id, kind.name(), input)
}

#[async_trait]
impl LlmClient for MockClient {
    async fn complete(&self, request: &AgentRequest) -> Result<AgentResponse> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        self.answer(&request.prompt)
    }

    fn label(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> AgentRequest {
        AgentRequest {
            agent: "test".to_string(),
            system: String::new(),
            prompt: prompt.to_string(),
            attempt: 1,
        }
    }

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive() {
        let mock = MockClient::new(MockReply::Fail("no rule".to_string()))
            .with_rule("Builder", MockReply::Respond(AgentResponse::text("built")));

        let response = mock.complete(&request("you are the BUILDER")).await.unwrap();
        assert_eq!(response.text, "built");
        assert!(mock.complete(&request("unrelated")).await.is_err());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_limited_rule_falls_through() {
        let mock = MockClient::new(MockReply::Respond(AgentResponse::text("default")))
            .with_rule_times("agent", MockReply::Limit("slow down".to_string()), 2)
            .with_rule("agent", MockReply::Respond(AgentResponse::text("ok")));

        for _ in 0..2 {
            let err = mock.complete(&request("agent")).await.unwrap_err();
            assert!(err.is_transient());
        }
        let response = mock.complete(&request("agent")).await.unwrap();
        assert_eq!(response.text, "ok");
    }

    #[tokio::test]
    async fn test_first_rule_wins() {
        let mock = MockClient::new(MockReply::Fail("none".to_string()))
            .with_rule("alpha", MockReply::Respond(AgentResponse::text("first")))
            .with_rule("alpha", MockReply::Respond(AgentResponse::text("second")));

        assert_eq!(mock.complete(&request("alpha")).await.unwrap().text, "first");
        assert_eq!(mock.complete(&request("alpha")).await.unwrap().text, "first");
    }

    #[tokio::test]
    async fn test_prompts_are_recorded() {
        let mock = MockClient::scaffolding();
        mock.complete(&request("# AGENT: rapid-builder")).await.unwrap();
        assert_eq!(mock.prompts(), vec!["# AGENT: rapid-builder".to_string()]);
    }

    #[tokio::test]
    async fn test_scaffolding_flaws() {
        let mock = MockClient::scaffolding();

        let builder = mock.complete(&request("rapid-builder")).await.unwrap();
        assert_eq!(builder.tool_calls[2].str_param("content"), Some("TODO"));

        let frontend = mock.complete(&request("frontend-specialist")).await.unwrap();
        assert!(frontend.tool_calls[2].str_param("content").is_none());

        let qa_first = mock.complete(&request("quality-guardian")).await.unwrap();
        assert!(qa_first.tool_calls.is_empty());
        let qa_second = mock.complete(&request("quality-guardian")).await.unwrap();
        assert_eq!(qa_second.tool_calls.len(), 1);

        let analyst = mock.complete(&request("requirements-analyst")).await.unwrap();
        assert!(analyst.tool_calls.is_empty());
        assert!(analyst.text.contains("<write_to_file>"));
    }
}
