//! Tool executor - runs (repaired) tool calls against the output directory
//!
//! Every path is validated before it is touched: no absolute paths, no
//! `..` components, nothing under a protected name. Decisions are appended
//! to `.swarmguard/decisions.jsonl` inside the output root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use swarmguard_core::config::STATE_DIR;
use swarmguard_core::{Result, SwarmError, ToolCall, ToolKind};

/// What a single successful call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    FileWritten { path: String, created: bool },
    DirectoryCreated { path: String },
    DecisionRecorded { decision: String },
    TaskCompleted { summary: String },
}

/// A decision appended to the decision log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub decision: String,
    pub rationale: String,
}

/// Result of executing all calls of one attempt
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Files that were created
    pub files_created: Vec<String>,
    /// Files that were overwritten
    pub files_modified: Vec<String>,
    pub directories_created: Vec<String>,
    pub decisions: Vec<String>,
    /// Summary from `complete_task`, if called
    pub completion: Option<String>,
    /// Errors encountered during execution
    pub errors: Vec<String>,
}

impl ExecutionResult {
    /// Generate a summary string
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.files_created.is_empty() {
            parts.push(format!("{} created", self.files_created.len()));
        }
        if !self.files_modified.is_empty() {
            parts.push(format!("{} modified", self.files_modified.len()));
        }
        if !self.directories_created.is_empty() {
            parts.push(format!("{} directories", self.directories_created.len()));
        }
        if !self.decisions.is_empty() {
            parts.push(format!("{} decisions", self.decisions.len()));
        }
        if !self.errors.is_empty() {
            parts.push(format!("{} errors", self.errors.len()));
        }

        if parts.is_empty() {
            "no tool calls".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// All files written, created or overwritten
    pub fn written_files(&self) -> impl Iterator<Item = &String> {
        self.files_created.iter().chain(self.files_modified.iter())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record(&mut self, outcome: ToolOutcome) {
        match outcome {
            ToolOutcome::FileWritten { path, created: true } => self.files_created.push(path),
            ToolOutcome::FileWritten { path, created: false } => self.files_modified.push(path),
            ToolOutcome::DirectoryCreated { path } => self.directories_created.push(path),
            ToolOutcome::DecisionRecorded { decision } => self.decisions.push(decision),
            ToolOutcome::TaskCompleted { summary } => self.completion = Some(summary),
        }
    }
}

/// Executes tool calls rooted at one output directory
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    root: PathBuf,
    protected: Vec<String>,
}

impl ToolExecutor {
    pub fn new(root: impl Into<PathBuf>, protected: Vec<String>) -> Self {
        Self {
            root: root.into(),
            protected,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the decision log
    pub fn decisions_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("decisions.jsonl")
    }

    /// Validate that a relative path is safe to write to
    pub fn validate_path(&self, path: &str) -> Result<PathBuf> {
        let path = Path::new(path.trim());

        if path.as_os_str().is_empty() {
            return Err(SwarmError::PathValidation("Empty path".to_string()));
        }

        if path.is_absolute() {
            return Err(SwarmError::PathValidation(format!(
                "Absolute paths not allowed: {}",
                path.display()
            )));
        }

        for component in path.components() {
            if let Component::ParentDir = component {
                return Err(SwarmError::PathValidation(format!(
                    "Path traversal not allowed: {}",
                    path.display()
                )));
            }
        }

        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            for protected in &self.protected {
                if name == protected || path.starts_with(protected) {
                    return Err(SwarmError::PathValidation(format!(
                        "Cannot write to protected file: {}",
                        name
                    )));
                }
            }
        }

        Ok(self.root.join(path))
    }

    /// Execute every call, collecting errors instead of stopping
    pub fn execute_all(&self, calls: &[ToolCall], agent: &str) -> ExecutionResult {
        let mut result = ExecutionResult::default();
        for call in calls {
            match self.execute(call, agent) {
                Ok(outcome) => result.record(outcome),
                Err(e) => {
                    tracing::warn!("{} call '{}' failed: {}", agent, call.name, e);
                    result.errors.push(e.to_string());
                }
            }
        }
        result
    }

    /// Execute a single call
    pub fn execute(&self, call: &ToolCall, agent: &str) -> Result<ToolOutcome> {
        let kind = call
            .kind()
            .ok_or_else(|| SwarmError::ToolCall(format!("unknown tool: {}", call.name)))?;

        match kind {
            ToolKind::WriteFile => {
                let path = required(call, kind, "file_path")?.trim().to_string();
                let content = required(call, kind, "content")?;
                let created = self.write_file(&path, content)?;
                Ok(ToolOutcome::FileWritten { path, created })
            }
            ToolKind::CreateDirectory => {
                let path = required(call, kind, "path")?.trim().to_string();
                let full = self.validate_path(&path)?;
                fs::create_dir_all(&full)?;
                tracing::info!("Created directory: {}", full.display());
                Ok(ToolOutcome::DirectoryCreated { path })
            }
            ToolKind::RecordDecision => {
                let decision = required(call, kind, "decision")?;
                let rationale = required(call, kind, "rationale")?;
                self.append_decision(&DecisionRecord {
                    timestamp: Utc::now(),
                    agent: agent.to_string(),
                    decision: decision.to_string(),
                    rationale: rationale.to_string(),
                })?;
                Ok(ToolOutcome::DecisionRecorded {
                    decision: decision.to_string(),
                })
            }
            ToolKind::CompleteTask => {
                let summary = required(call, kind, "summary")?;
                tracing::info!("{} reports completion: {}", agent, summary);
                Ok(ToolOutcome::TaskCompleted {
                    summary: summary.to_string(),
                })
            }
        }
    }

    /// Write a file; returns Ok(true) if it was created, Ok(false) if overwritten
    pub fn write_file(&self, path: &str, content: &str) -> Result<bool> {
        let full = self.validate_path(path)?;
        let created = !full.exists();

        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                tracing::debug!("Created directory: {}", parent.display());
            }
        }

        fs::write(&full, content)?;

        if created {
            tracing::info!("Created file: {}", full.display());
        } else {
            tracing::info!("Modified file: {}", full.display());
        }
        Ok(created)
    }

    fn append_decision(&self, record: &DecisionRecord) -> Result<()> {
        let path = self.decisions_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Decisions recorded so far, oldest first
    pub fn read_decisions(&self) -> Result<Vec<DecisionRecord>> {
        let path = self.decisions_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        fs::read_to_string(&path)?
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(SwarmError::from))
            .collect()
    }
}

/// A required string parameter, rejecting absent and blank values
fn required<'a>(call: &'a ToolCall, kind: ToolKind, field: &str) -> Result<&'a str> {
    match call.str_param(field) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SwarmError::ToolCall(format!(
            "{} missing required parameter '{}'",
            kind, field
        ))),
    }
}
