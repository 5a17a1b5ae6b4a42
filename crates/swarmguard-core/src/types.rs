//! Core type definitions for swarmguard

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tools an agent may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WriteFile,
    CreateDirectory,
    RecordDecision,
    CompleteTask,
}

impl ToolKind {
    /// All known tools, in the order they are advertised to the model
    pub const ALL: [ToolKind; 4] = [
        ToolKind::WriteFile,
        ToolKind::CreateDirectory,
        ToolKind::RecordDecision,
        ToolKind::CompleteTask,
    ];

    /// Wire name used in tool calls
    pub fn name(&self) -> &'static str {
        match self {
            Self::WriteFile => "write_file",
            Self::CreateDirectory => "create_directory",
            Self::RecordDecision => "record_decision",
            Self::CompleteTask => "complete_task",
        }
    }

    /// Parameters that must be present and non-placeholder
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::WriteFile => &["file_path", "content"],
            Self::CreateDirectory => &["path"],
            Self::RecordDecision => &["decision", "rationale"],
            Self::CompleteTask => &["summary"],
        }
    }

    /// One-line description shown to the model
    pub fn description(&self) -> &'static str {
        match self {
            Self::WriteFile => "Write the COMPLETE content of a file, relative to the project root.",
            Self::CreateDirectory => "Create a directory (and parents), relative to the project root.",
            Self::RecordDecision => "Record an architectural or process decision with its rationale.",
            Self::CompleteTask => "Signal that the assigned task is finished, with a short summary.",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "write_file" | "write_to_file" => Ok(Self::WriteFile),
            "create_directory" | "mkdir" => Ok(Self::CreateDirectory),
            "record_decision" => Ok(Self::RecordDecision),
            "complete_task" => Ok(Self::CompleteTask),
            _ => Err(format!("unknown tool: {}", s)),
        }
    }
}

/// A single tool invocation emitted by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id (synthesized for XML blocks and mock responses)
    pub id: String,
    /// Tool name as sent by the model
    pub name: String,
    /// Raw parameters
    pub input: Map<String, Value>,
}

impl ToolCall {
    /// Create a tool call from a name and parameter map
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Convenience constructor for a `write_file` call
    pub fn write_file(id: impl Into<String>, path: &str, content: &str) -> Self {
        let mut input = Map::new();
        input.insert("file_path".to_string(), Value::String(path.to_string()));
        input.insert("content".to_string(), Value::String(content.to_string()));
        Self::new(id, ToolKind::WriteFile.name(), input)
    }

    /// Resolve the tool kind, if the name is known
    pub fn kind(&self) -> Option<ToolKind> {
        self.name.parse().ok()
    }

    /// Read a string parameter
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }
}

/// A named agent role. Its behavior is entirely its prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRole {
    pub name: String,
    pub prompt: String,
}

impl AgentRole {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

/// One unit of work handed to one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTask {
    /// Agent name, must exist in the roster
    pub agent: String,
    /// What the agent should do
    pub description: String,
    /// Files the agent must produce, relative to the output root
    #[serde(default)]
    pub expected_files: Vec<String>,
}

impl AgentTask {
    pub fn new(agent: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            description: description.into(),
            expected_files: Vec::new(),
        }
    }

    pub fn with_expected_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_files = files.into_iter().map(Into::into).collect();
        self
    }
}

/// Final status of a task after retries and fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Agent succeeded on the first attempt
    Completed,
    /// Agent succeeded after one or more failed attempts
    CompletedAfterRetry,
    /// Agent never succeeded; files were synthesized directly
    Fallback,
    /// Even the fallback could not write the files
    Failed,
}

impl TaskStatus {
    /// Whether the task produced its files (by the agent or by fallback)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::CompletedAfterRetry => write!(f, "completed_after_retry"),
            Self::Fallback => write!(f, "fallback"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_roundtrip_names() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.name().parse::<ToolKind>().unwrap(), kind);
        }
        assert_eq!("WRITE_TO_FILE".parse::<ToolKind>().unwrap(), ToolKind::WriteFile);
        assert!("delete_everything".parse::<ToolKind>().is_err());
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(ToolKind::WriteFile.required_fields(), &["file_path", "content"]);
        assert_eq!(ToolKind::CompleteTask.required_fields(), &["summary"]);
    }

    #[test]
    fn test_tool_call_helpers() {
        let call = ToolCall::write_file("t1", "src/main.py", "print('hi')");
        assert_eq!(call.kind(), Some(ToolKind::WriteFile));
        assert_eq!(call.str_param("file_path"), Some("src/main.py"));
        assert_eq!(call.str_param("missing"), None);
    }

    #[test]
    fn test_task_status_success() {
        assert!(TaskStatus::Fallback.is_success());
        assert!(!TaskStatus::Failed.is_success());
        assert_eq!(TaskStatus::CompletedAfterRetry.to_string(), "completed_after_retry");
    }

    #[test]
    fn test_agent_task_builder() {
        let task = AgentTask::new("rapid-builder", "build it").with_expected_files(["a.py", "b.py"]);
        assert_eq!(task.expected_files, vec!["a.py".to_string(), "b.py".to_string()]);
    }
}
