//! Tool-call parameter repair
//!
//! Agents stuck in a loop usually fail the same way: they call `write_file`
//! with no content, with "TODO", or with a path like `path/to/file`. The
//! interceptor looks at every call before it is executed and fills such
//! fields from [`ContentGenerator`], so the call succeeds instead of
//! producing the same error again.

use crate::content::{ContentGenerator, TemplateContext, MARKER_PHRASES};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use swarmguard_core::config::InterceptorConfig;
use swarmguard_core::{ToolCall, ToolKind};

/// Values that are placeholders when they make up (nearly) the whole field
const SHORT_VALUE_KEYWORDS: &[&str] = &["todo", "tbd", "placeholder", "...", "…", "fill in", "n/a", "xxx"];

/// Fields no longer than this are checked against [`SHORT_VALUE_KEYWORDS`]
const SHORT_VALUE_LIMIT: usize = 60;

/// Path fragments that only appear in example paths
const PATH_MARKERS: &[&str] = &["path/to/", "<", ">", "{", "}", "[", "]", "...", "*"];

/// Per-task state the interceptor needs to choose repair values
#[derive(Debug, Clone)]
pub struct InterceptContext {
    pub project: String,
    pub agent: String,
    pub task: String,
    /// Expected files not yet written and not claimed by a call in this batch
    pending_files: VecDeque<String>,
    generated_paths: usize,
}

impl InterceptContext {
    /// `pending_files` are the task's expected files still missing on disk
    pub fn new(project: &str, agent: &str, task: &str, pending_files: &[String]) -> Self {
        Self {
            project: project.to_string(),
            agent: agent.to_string(),
            task: task.to_string(),
            pending_files: pending_files.iter().cloned().collect(),
            generated_paths: 0,
        }
    }

    fn claim(&mut self, path: &str) {
        self.pending_files.retain(|p| p != path);
    }

    fn next_path(&mut self) -> String {
        if let Some(path) = self.pending_files.pop_front() {
            return path;
        }
        self.generated_paths += 1;
        format!("{}_output_{}.md", self.agent, self.generated_paths)
    }

    fn template_context(&self) -> TemplateContext {
        TemplateContext::new(&self.project, &self.agent, &self.task)
    }
}

/// A tool call after inspection
#[derive(Debug, Clone, PartialEq)]
pub struct Interception {
    pub tool: String,
    pub params: Map<String, Value>,
    /// Names of fields that were filled in
    pub patched_fields: Vec<String>,
    /// Unknown tool, forwarded untouched
    pub passthrough: bool,
}

impl Interception {
    pub fn was_patched(&self) -> bool {
        !self.patched_fields.is_empty()
    }

    /// Turn the (possibly patched) parameters back into a call
    pub fn into_call(self, id: impl Into<String>) -> ToolCall {
        ToolCall::new(id, self.tool, self.params)
    }
}

/// One entry of the call history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptRecord {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub tool: String,
    pub patched_fields: Vec<String>,
}

/// Aggregate counters, kept even after history entries age out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterceptorStats {
    pub total_calls: usize,
    pub patched_calls: usize,
    pub passthrough_calls: usize,
    /// `tool.field` -> number of repairs
    pub field_repairs: BTreeMap<String, usize>,
}

/// Inspects and repairs tool-call parameters
#[derive(Debug)]
pub struct UniversalInterceptor {
    generator: ContentGenerator,
    extra_placeholders: Vec<String>,
    history: VecDeque<InterceptRecord>,
    history_limit: usize,
    stats: InterceptorStats,
}

impl UniversalInterceptor {
    pub fn new(config: &InterceptorConfig) -> Self {
        Self {
            generator: ContentGenerator::new(),
            extra_placeholders: config
                .extra_placeholders
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            history: VecDeque::new(),
            history_limit: config.history_limit.max(1),
            stats: InterceptorStats::default(),
        }
    }

    /// Inspect a batch of calls from one response
    ///
    /// Valid explicit paths are claimed before any call is repaired, so a
    /// call without a path never takes a file another call in the batch names.
    pub fn intercept_all(&mut self, calls: &[ToolCall], ctx: &mut InterceptContext) -> Vec<Interception> {
        for call in calls {
            if call.kind() != Some(ToolKind::WriteFile) {
                continue;
            }
            if let Some(Value::String(p)) = call.input.get("file_path") {
                if !path_needs_repair(p) {
                    ctx.claim(p.trim());
                }
            }
        }
        calls.iter().map(|call| self.intercept(call, ctx)).collect()
    }

    /// Inspect one call, returning repaired parameters
    pub fn intercept(&mut self, call: &ToolCall, ctx: &mut InterceptContext) -> Interception {
        let mut params = call.input.clone();
        let mut patched_fields = Vec::new();

        let Some(kind) = call.kind() else {
            tracing::debug!("Passing through unknown tool '{}'", call.name);
            self.record(ctx, &call.name, &patched_fields, true);
            return Interception {
                tool: call.name.clone(),
                params,
                patched_fields,
                passthrough: true,
            };
        };

        match kind {
            ToolKind::WriteFile => {
                let path = match params.get("file_path") {
                    Some(Value::String(p)) if !path_needs_repair(p) => {
                        let p = p.trim().to_string();
                        ctx.claim(&p);
                        p
                    }
                    _ => {
                        let p = ctx.next_path();
                        params.insert("file_path".to_string(), Value::String(p.clone()));
                        patched_fields.push("file_path".to_string());
                        p
                    }
                };
                if self.needs_repair(params.get("content")) {
                    let content = self.generator.generate(&path, &ctx.template_context());
                    params.insert("content".to_string(), Value::String(content));
                    patched_fields.push("content".to_string());
                }
            }
            ToolKind::CreateDirectory => {
                let needs = match params.get("path") {
                    Some(Value::String(p)) => path_needs_repair(p),
                    _ => true,
                };
                if needs {
                    params.insert(
                        "path".to_string(),
                        Value::String(format!("{}_workspace", ctx.agent)),
                    );
                    patched_fields.push("path".to_string());
                }
            }
            ToolKind::RecordDecision => {
                if self.needs_repair(params.get("decision")) {
                    params.insert(
                        "decision".to_string(),
                        Value::String(format!("{} proceeds with: {}", ctx.agent, ctx.task)),
                    );
                    patched_fields.push("decision".to_string());
                }
                if self.needs_repair(params.get("rationale")) {
                    params.insert(
                        "rationale".to_string(),
                        Value::String(format!(
                            "Chosen by {} as the most direct way to deliver the task for {}.",
                            ctx.agent, ctx.project
                        )),
                    );
                    patched_fields.push("rationale".to_string());
                }
            }
            ToolKind::CompleteTask => {
                if self.needs_repair(params.get("summary")) {
                    params.insert(
                        "summary".to_string(),
                        Value::String(format!("{} finished: {}", ctx.agent, ctx.task)),
                    );
                    patched_fields.push("summary".to_string());
                }
            }
        }

        if !patched_fields.is_empty() {
            tracing::debug!(
                "Patched {} fields on {} from {}: {:?}",
                patched_fields.len(),
                kind,
                ctx.agent,
                patched_fields
            );
        }
        self.record(ctx, kind.name(), &patched_fields, false);

        Interception {
            tool: kind.name().to_string(),
            params,
            patched_fields,
            passthrough: false,
        }
    }

    fn needs_repair(&self, value: Option<&Value>) -> bool {
        match value {
            Some(Value::String(s)) => is_placeholder(s, &self.extra_placeholders),
            _ => true,
        }
    }

    fn record(&mut self, ctx: &InterceptContext, tool: &str, patched: &[String], passthrough: bool) {
        self.stats.total_calls += 1;
        if passthrough {
            self.stats.passthrough_calls += 1;
        }
        if !patched.is_empty() {
            self.stats.patched_calls += 1;
            for field in patched {
                *self
                    .stats
                    .field_repairs
                    .entry(format!("{}.{}", tool, field))
                    .or_insert(0) += 1;
            }
        }

        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(InterceptRecord {
            timestamp: Utc::now(),
            agent: ctx.agent.clone(),
            tool: tool.to_string(),
            patched_fields: patched.to_vec(),
        });
    }

    /// Recent interceptions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &InterceptRecord> {
        self.history.iter()
    }

    pub fn stats(&self) -> &InterceptorStats {
        &self.stats
    }
}

impl Default for UniversalInterceptor {
    fn default() -> Self {
        Self::new(&InterceptorConfig {
            extra_placeholders: Vec::new(),
            history_limit: 1000,
        })
    }
}

/// Whether a text value is empty or a stand-in for real content
pub fn is_placeholder(value: &str, extra: &[String]) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();

    if MARKER_PHRASES.iter().any(|m| lower.contains(m)) {
        return true;
    }
    if extra.iter().any(|m| lower.contains(m.as_str())) {
        return true;
    }
    lower.chars().count() <= SHORT_VALUE_LIMIT
        && SHORT_VALUE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Whether a path is empty or obviously an example path
fn path_needs_repair(path: &str) -> bool {
    let trimmed = path.trim();
    trimmed.is_empty() || PATH_MARKERS.iter().any(|m| trimmed.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(expected: &[&str]) -> InterceptContext {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        InterceptContext::new("Shop", "rapid-builder", "Build the API", &expected)
    }

    fn call(name: &str, input: Value) -> ToolCall {
        match input {
            Value::Object(map) => ToolCall::new("c1", name, map),
            _ => ToolCall::new("c1", name, Map::new()),
        }
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("", &[]));
        assert!(is_placeholder("   \n", &[]));
        assert!(is_placeholder("TODO", &[]));
        assert!(is_placeholder("# TODO: implement", &[]));
        assert!(is_placeholder("...", &[]));
        assert!(is_placeholder("def main():\n    # your code here\n", &[]));
        assert!(!is_placeholder("print('hello')", &[]));
        // long real content that merely mentions a keyword
        let readme = "# todo-app\n\nA small application for tracking the things you need to do every day.";
        assert!(!is_placeholder(readme, &[]));
        assert!(is_placeholder("WIP stub", &["wip".to_string()]));
    }

    #[test]
    fn test_complete_call_untouched() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&["app.py"]);
        let original = call("write_file", json!({"file_path": "app.py", "content": "x = 1\n"}));

        let result = interceptor.intercept(&original, &mut ctx);
        assert!(!result.was_patched());
        assert_eq!(result.params, original.input);
        assert_eq!(interceptor.stats().total_calls, 1);
        assert_eq!(interceptor.stats().patched_calls, 0);
    }

    #[test]
    fn test_missing_content_generated_from_path() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);
        let result = interceptor.intercept(&call("write_file", json!({"file_path": "Dockerfile"})), &mut ctx);

        assert_eq!(result.patched_fields, vec!["content".to_string()]);
        let content = result.params["content"].as_str().unwrap();
        assert!(content.starts_with("FROM python"));
    }

    #[test]
    fn test_placeholder_content_replaced() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);
        let result = interceptor.intercept(
            &call("write_file", json!({"file_path": "requirements.txt", "content": "TODO"})),
            &mut ctx,
        );
        assert!(result.params["content"].as_str().unwrap().contains("fastapi"));
    }

    #[test]
    fn test_non_string_content_replaced() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);
        let result = interceptor.intercept(
            &call("write_file", json!({"file_path": "a.md", "content": null})),
            &mut ctx,
        );
        assert_eq!(result.patched_fields, vec!["content".to_string()]);
    }

    #[test]
    fn test_missing_path_takes_next_expected_file() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&["backend/main.py", "backend/models.py"]);

        // main.py is claimed by an explicit call, so the repair picks models.py
        interceptor.intercept(
            &call("write_file", json!({"file_path": "backend/main.py", "content": "app = 1"})),
            &mut ctx,
        );
        let repaired = interceptor.intercept(&call("write_file", json!({"content": "class Item: pass"})), &mut ctx);
        assert_eq!(repaired.params["file_path"], "backend/models.py");
        assert_eq!(repaired.params["content"], "class Item: pass");

        let extra = interceptor.intercept(&call("write_file", json!({"file_path": "path/to/file.py"})), &mut ctx);
        assert_eq!(extra.params["file_path"], "rapid-builder_output_1.md");
        assert_eq!(
            extra.patched_fields,
            vec!["file_path".to_string(), "content".to_string()]
        );
    }

    #[test]
    fn test_pathless_call_does_not_take_a_later_explicit_path() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&["a.py", "b.txt"]);
        let calls = vec![
            call("write_file", json!({"content": "notes for the team"})),
            call("write_file", json!({"file_path": "a.py", "content": "x = 1\n"})),
        ];

        let result = interceptor.intercept_all(&calls, &mut ctx);
        assert_eq!(result[0].params["file_path"], "b.txt");
        assert_eq!(result[1].params["file_path"], "a.py");
        assert!(!result[1].was_patched());
    }

    #[test]
    fn test_blank_extra_placeholders_ignored() {
        let mut interceptor = UniversalInterceptor::new(&InterceptorConfig {
            extra_placeholders: vec!["".to_string(), "  ".to_string(), "WIP".to_string()],
            history_limit: 10,
        });
        assert_eq!(interceptor.extra_placeholders, vec!["wip".to_string()]);

        let mut ctx = ctx(&[]);
        let result = interceptor.intercept(
            &call("write_file", json!({"file_path": "a.py", "content": "x = 1\n"})),
            &mut ctx,
        );
        assert!(!result.was_patched());
    }

    #[test]
    fn test_create_directory_repair() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);
        let result = interceptor.intercept(&call("create_directory", json!({"path": "<dir>"})), &mut ctx);
        assert_eq!(result.params["path"], "rapid-builder_workspace");
    }

    #[test]
    fn test_record_decision_and_complete_task() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);

        let decision = interceptor.intercept(
            &call("record_decision", json!({"decision": "Use SQLite"})),
            &mut ctx,
        );
        assert_eq!(decision.patched_fields, vec!["rationale".to_string()]);
        assert_eq!(decision.params["decision"], "Use SQLite");

        let done = interceptor.intercept(&call("complete_task", json!({})), &mut ctx);
        assert_eq!(done.params["summary"], "rapid-builder finished: Build the API");
    }

    #[test]
    fn test_unknown_tool_passthrough() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);
        let original = call("run_shell", json!({"cmd": ""}));
        let result = interceptor.intercept(&original, &mut ctx);

        assert!(result.passthrough);
        assert!(!result.was_patched());
        assert_eq!(result.params, original.input);
        assert_eq!(interceptor.stats().passthrough_calls, 1);
    }

    #[test]
    fn test_stats_and_bounded_history() {
        let mut interceptor = UniversalInterceptor::new(&InterceptorConfig {
            extra_placeholders: vec![],
            history_limit: 2,
        });
        let mut ctx = ctx(&[]);
        for _ in 0..3 {
            interceptor.intercept(&call("write_file", json!({"file_path": "a.py"})), &mut ctx);
        }

        assert_eq!(interceptor.history().count(), 2);
        let stats = interceptor.stats();
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.patched_calls, 3);
        assert_eq!(stats.field_repairs.get("write_file.content"), Some(&3));
    }

    #[test]
    fn test_into_call_keeps_tool_name() {
        let mut interceptor = UniversalInterceptor::default();
        let mut ctx = ctx(&[]);
        let call = interceptor
            .intercept(&call("WRITE_TO_FILE", json!({"file_path": "a.py"})), &mut ctx)
            .into_call("c9");
        assert_eq!(call.name, "write_file");
        assert_eq!(call.id, "c9");
    }
}
