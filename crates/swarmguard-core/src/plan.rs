//! Agent roster and task plans

use crate::{AgentRole, AgentTask, Result, SwarmError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An ordered list of agent tasks for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Project name, interpolated into prompts and templates
    pub project: String,
    /// Tasks run strictly in order
    pub tasks: Vec<AgentTask>,
    /// Extra or overriding agent roles
    #[serde(default)]
    pub agents: Vec<AgentRole>,
}

impl Plan {
    /// Load a plan from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan: Plan = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| SwarmError::Plan(format!("Failed to parse plan file: {}", e)))?,
            _ => {
                return Err(SwarmError::Plan(format!(
                    "Unsupported plan format: {} (use .toml or .json)",
                    path.display()
                )))
            }
        };
        plan.validate()?;
        Ok(plan)
    }

    /// The roster this plan runs with: builtin roles, overridden or extended by `agents`
    pub fn roster(&self) -> Vec<AgentRole> {
        let mut roster = builtin_roster();
        for role in &self.agents {
            match roster.iter_mut().find(|r| r.name == role.name) {
                Some(existing) => existing.prompt = role.prompt.clone(),
                None => roster.push(role.clone()),
            }
        }
        roster
    }

    /// Look up the role for an agent name
    pub fn role_for(&self, agent: &str) -> Result<AgentRole> {
        self.roster()
            .into_iter()
            .find(|r| r.name == agent)
            .ok_or_else(|| SwarmError::AgentNotFound(agent.to_string()))
    }

    /// Check every task names a known agent
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(SwarmError::Plan("plan has no tasks".to_string()));
        }
        let roster = self.roster();
        for task in &self.tasks {
            if !roster.iter().any(|r| r.name == task.agent) {
                return Err(SwarmError::AgentNotFound(task.agent.clone()));
            }
        }
        Ok(())
    }
}

/// The builtin agent roles
pub fn builtin_roster() -> Vec<AgentRole> {
    vec![
        AgentRole::new(
            "requirements-analyst",
            "You are a requirements analyst. Turn the project idea into concrete, testable \
             requirements and record the key scoping decisions.",
        ),
        AgentRole::new(
            "project-architect",
            "You are a software architect. Choose the stack, define the module layout and \
             data model, and document the architecture so builders can follow it.",
        ),
        AgentRole::new(
            "rapid-builder",
            "You are a rapid builder. Write working backend code quickly, favoring small, \
             complete files over elaborate abstractions.",
        ),
        AgentRole::new(
            "frontend-specialist",
            "You are a frontend specialist. Build the user-facing pages, styles and client \
             scripts that talk to the backend API.",
        ),
        AgentRole::new(
            "quality-guardian",
            "You are a quality guardian. Write automated tests for the code that exists and \
             document how to run them.",
        ),
        AgentRole::new(
            "devops-engineer",
            "You are a DevOps engineer. Containerize the project and provide the files needed \
             to build and run it locally.",
        ),
    ]
}

/// The default scaffolding plan: every builtin agent, in pipeline order
pub fn default_plan(project: &str) -> Plan {
    Plan {
        project: project.to_string(),
        tasks: vec![
            AgentTask::new(
                "requirements-analyst",
                format!("Write the requirements document for {}.", project),
            )
            .with_expected_files(["docs/requirements.md"]),
            AgentTask::new(
                "project-architect",
                format!("Design the architecture for {} and describe it.", project),
            )
            .with_expected_files(["docs/architecture.md", "README.md"]),
            AgentTask::new(
                "rapid-builder",
                format!("Implement the backend API for {}.", project),
            )
            .with_expected_files(["backend/main.py", "backend/models.py", "requirements.txt"]),
            AgentTask::new(
                "frontend-specialist",
                format!("Build the web frontend for {}.", project),
            )
            .with_expected_files(["frontend/index.html", "frontend/styles.css", "frontend/app.js"]),
            AgentTask::new(
                "quality-guardian",
                format!("Write tests for the {} backend.", project),
            )
            .with_expected_files(["tests/test_api.py"]),
            AgentTask::new(
                "devops-engineer",
                format!("Containerize {} for local development.", project),
            )
            .with_expected_files(["Dockerfile", "docker-compose.yml", ".gitignore"]),
        ],
        agents: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_plan_is_valid() {
        let plan = default_plan("todo-app");
        assert!(plan.validate().is_ok());
        assert_eq!(plan.tasks.len(), 6);
        assert_eq!(plan.tasks[0].agent, "requirements-analyst");
    }

    #[test]
    fn test_roster_names_are_unique() {
        let roster = builtin_roster();
        let mut names: Vec<_> = roster.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), roster.len());
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let mut plan = default_plan("x");
        plan.tasks.push(AgentTask::new("ghost-writer", "haunt"));
        assert!(matches!(plan.validate(), Err(SwarmError::AgentNotFound(name)) if name == "ghost-writer"));
    }

    #[test]
    fn test_custom_agent_extends_roster() {
        let mut plan = default_plan("x");
        plan.agents.push(AgentRole::new("doc-writer", "You write docs."));
        plan.agents.push(AgentRole::new("rapid-builder", "Override."));
        plan.tasks.push(AgentTask::new("doc-writer", "docs"));

        assert!(plan.validate().is_ok());
        assert_eq!(plan.role_for("rapid-builder").unwrap().prompt, "Override.");
        assert_eq!(plan.roster().len(), builtin_roster().len() + 1);
    }

    #[test]
    fn test_load_toml_plan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(
            &path,
            r#"
project = "shop"

[[tasks]]
agent = "rapid-builder"
description = "Build the API"
expected_files = ["api/main.py"]
"#,
        )
        .unwrap();

        let plan = Plan::load(&path).unwrap();
        assert_eq!(plan.project, "shop");
        assert_eq!(plan.tasks[0].expected_files, vec!["api/main.py".to_string()]);
    }

    #[test]
    fn test_load_json_plan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"project":"shop","tasks":[{"agent":"devops-engineer","description":"Dockerize"}]}"#,
        )
        .unwrap();

        let plan = Plan::load(&path).unwrap();
        assert!(plan.tasks[0].expected_files.is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.yaml");
        std::fs::write(&path, "project: x").unwrap();
        assert!(matches!(Plan::load(&path), Err(SwarmError::Plan(_))));
    }
}
