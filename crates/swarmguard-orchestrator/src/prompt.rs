//! Prompt builder for agent attempts
//!
//! Constructs prompts that provide agents with:
//! - Recovery instructions chosen by the loop breaker (first, when present)
//! - Task description and expected files
//! - The error from the previous attempt
//! - Tool usage instructions
//!
//! The role prompt goes into the system prompt. The task prompt names only
//! the agent it is addressed to.

use crate::loop_breaker::Intervention;
use swarmguard_core::{AgentRole, AgentTask, ToolKind};

/// Everything needed to prompt one attempt
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub project: &'a str,
    pub task: &'a AgentTask,
    pub attempt: usize,
    pub max_attempts: usize,
    pub intervention: Option<&'a Intervention>,
    pub last_error: Option<&'a str>,
}

/// System prompt for a role
pub fn build_system_prompt(role: &AgentRole) -> String {
    format!(
        "{}\n\nYou work by calling tools. Every file you produce must be complete and \
         ready to use.",
        role.prompt
    )
}

/// Build the task prompt for one attempt
pub fn build_agent_prompt(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "# AGENT: {} - Attempt {} of {}\n\n",
        input.task.agent, input.attempt, input.max_attempts
    ));

    if let Some(intervention) = input.intervention {
        prompt.push_str("## RECOVERY INSTRUCTIONS\n\n");
        prompt.push_str(&intervention.instruction);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!("## PROJECT\n\n{}\n\n", input.project));

    prompt.push_str("## TASK\n\n");
    prompt.push_str(&input.task.description);
    prompt.push_str("\n\n");

    if !input.task.expected_files.is_empty() {
        prompt.push_str("## EXPECTED FILES\n\n");
        prompt.push_str("Write every one of these files, with these exact paths:\n");
        for file in &input.task.expected_files {
            prompt.push_str(&format!("- {}\n", file));
        }
        prompt.push('\n');
    }

    if let Some(error) = input.last_error {
        prompt.push_str("## PREVIOUS ATTEMPT FAILED\n\n");
        prompt.push_str("```\n");
        prompt.push_str(error);
        prompt.push_str("\n```\n\n");
    }

    prompt.push_str(&tool_instructions());
    prompt.push('\n');

    prompt.push_str("## OBJECTIVE\n\n");
    prompt.push_str("1. Write each expected file with write_file\n");
    prompt.push_str("2. Record any significant choice with record_decision\n");
    prompt.push_str("3. Call complete_task with a one-line summary\n");

    prompt
}

/// Tool list with required parameters
pub fn tool_instructions() -> String {
    let mut text = String::from("## TOOLS\n\n");
    for kind in ToolKind::ALL {
        text.push_str(&format!(
            "- `{}`({}): {}\n",
            kind,
            kind.required_fields().join(", "),
            kind.description()
        ));
    }
    text.push_str("\nAll parameters are required. Paths are relative to the project root.\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loop_breaker::{LoopBreaker, RecoveryStrategy};
    use swarmguard_core::{builtin_roster, default_plan};

    fn builder_task() -> AgentTask {
        AgentTask::new("rapid-builder", "Implement the backend API for Shop.")
            .with_expected_files(["backend/main.py", "requirements.txt"])
    }

    #[test]
    fn test_build_agent_prompt() {
        let task = builder_task();
        let prompt = build_agent_prompt(&PromptInput {
            project: "Shop",
            task: &task,
            attempt: 1,
            max_attempts: 4,
            intervention: None,
            last_error: None,
        });

        assert!(prompt.starts_with("# AGENT: rapid-builder - Attempt 1 of 4"));
        assert!(prompt.contains("Implement the backend API"));
        assert!(prompt.contains("- backend/main.py"));
        assert!(prompt.contains("`write_file`(file_path, content)"));
        assert!(!prompt.contains("RECOVERY INSTRUCTIONS"));
        assert!(!prompt.contains("PREVIOUS ATTEMPT FAILED"));
    }

    #[test]
    fn test_intervention_comes_before_task() {
        let mut lb = LoopBreaker::default();
        lb.record_failure("rapid-builder", "missing required parameter 'content'");
        let verdict = lb.record_failure("rapid-builder", "missing required parameter 'content'");
        let intervention = verdict.intervention.unwrap();
        assert_eq!(intervention.strategy, RecoveryStrategy::ParameterRepair);

        let task = builder_task();
        let prompt = build_agent_prompt(&PromptInput {
            project: "Shop",
            task: &task,
            attempt: 3,
            max_attempts: 4,
            intervention: Some(&intervention),
            last_error: Some("write_file missing required parameter 'content'"),
        });

        let recovery = prompt.find("## RECOVERY INSTRUCTIONS").unwrap();
        let task_pos = prompt.find("## TASK").unwrap();
        assert!(recovery < task_pos);
        assert!(prompt.contains("PREVIOUS ATTEMPT FAILED"));
    }

    #[test]
    fn test_prompt_names_only_its_agent() {
        let plan = default_plan("Shop");
        let names: Vec<_> = builtin_roster().into_iter().map(|r| r.name).collect();

        for task in &plan.tasks {
            let prompt = build_agent_prompt(&PromptInput {
                project: &plan.project,
                task,
                attempt: 1,
                max_attempts: 4,
                intervention: None,
                last_error: None,
            });
            for name in names.iter().filter(|n| **n != task.agent) {
                assert!(!prompt.contains(name.as_str()), "{} prompt mentions {}", task.agent, name);
            }
        }
    }

    #[test]
    fn test_system_prompt_uses_role() {
        let role = AgentRole::new("doc-writer", "You write docs.");
        assert!(build_system_prompt(&role).starts_with("You write docs."));
    }
}
