//! Intelligent orchestrator - runs a plan task by task
//!
//! Each task gets up to `max_attempts` fresh agent requests. Every attempt:
//! 1. Builds a prompt (recovery instruction first, when one is pending)
//! 2. Calls the LLM client
//! 3. Takes the tool calls, or parses `<write_to_file>` blocks from the text
//! 4. Repairs each call with the interceptor and executes it
//! 5. Checks that every expected file now exists
//!
//! A failed attempt is reported to the loop breaker, which may answer with an
//! intervention for the next attempt. `DirectBypass` or running out of
//! attempts ends with the fallback: the missing files are generated directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swarmguard_agent::{parse_write_blocks, AgentRequest, AgentResponse, LlmClient, Usage};
use swarmguard_core::config::{InterceptorConfig, LoopBreakerConfig, STATE_DIR};
use swarmguard_core::{
    AgentRole, AgentTask, Plan, Result, SwarmConfig, SwarmError, TaskStatus, ToolCall,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity_logger::ActivityLogger;
use crate::content::{ContentGenerator, TemplateContext};
use crate::executor::ToolExecutor;
use crate::interceptor::{InterceptContext, InterceptorStats, UniversalInterceptor};
use crate::loop_breaker::{Intervention, LoopBreaker, LoopBreakerStats, RecoveryStrategy};
use crate::prompt::{build_agent_prompt, build_system_prompt, PromptInput};

/// Configuration for an orchestrator run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Root that generated files are written under
    pub output_dir: PathBuf,
    /// Agent attempts per task before the fallback
    pub max_attempts: usize,
    pub loop_breaker: LoopBreakerConfig,
    pub interceptor: InterceptorConfig,
    /// Names agents may not write
    pub protected_files: Vec<String>,
    /// Write `.swarmguard/activity.md`
    pub activity_log: bool,
}

impl OrchestratorConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::from_settings(&SwarmConfig::default()).with_output_dir(output_dir)
    }

    /// Take every setting from a loaded config
    pub fn from_settings(config: &SwarmConfig) -> Self {
        Self {
            output_dir: config.orchestrator.output_dir.clone(),
            max_attempts: config.orchestrator.max_attempts,
            loop_breaker: config.loop_breaker,
            interceptor: config.interceptor.clone(),
            protected_files: config.protected_files.clone(),
            activity_log: true,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn without_activity_log(mut self) -> Self {
        self.activity_log = false;
        self
    }

    /// Directory for report, activity log and decisions
    pub fn state_dir(&self) -> PathBuf {
        self.output_dir.join(STATE_DIR)
    }
}

/// What happened to one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub agent: String,
    pub status: TaskStatus,
    /// Agent requests made
    pub attempts: usize,
    /// Files written for this task, by the agent or the fallback
    pub files: Vec<String>,
    /// Strategies applied, in order
    pub interventions: Vec<RecoveryStrategy>,
    /// Parameters filled in by the interceptor
    pub patched_fields: usize,
    /// Failure text of every failed attempt
    pub errors: Vec<String>,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub project: String,
    /// Label of the LLM client used
    pub client: String,
    pub outcomes: Vec<TaskOutcome>,
    pub loop_stats: LoopBreakerStats,
    pub interceptor_stats: InterceptorStats,
    pub usage: Usage,
}

impl SessionReport {
    /// Tasks that produced their files
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn any_failed(&self) -> bool {
        self.outcomes.iter().any(|o| !o.status.is_success())
    }

    /// Path of the report under a state directory
    pub fn path(state_dir: &Path) -> PathBuf {
        state_dir.join("report.json")
    }

    /// Write as pretty JSON to `<state_dir>/report.json`
    pub fn write(&self, state_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(state_dir)?;
        let path = Self::path(state_dir);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Result of a single attempt
struct AttemptReport {
    files_written: Vec<String>,
    patched_fields: usize,
    /// Failure text; `None` when the attempt succeeded
    failure: Option<String>,
}

/// Runs plans against an LLM client with loop detection and recovery
pub struct IntelligentOrchestrator {
    client: Arc<dyn LlmClient>,
    config: OrchestratorConfig,
    interceptor: UniversalInterceptor,
    loop_breaker: LoopBreaker,
    executor: ToolExecutor,
    generator: ContentGenerator,
    activity_logger: Option<ActivityLogger>,
    usage: Usage,
}

impl IntelligentOrchestrator {
    /// Create an orchestrator; fails on invalid loop breaker settings
    pub fn new(client: Arc<dyn LlmClient>, config: OrchestratorConfig) -> Result<Self> {
        if config.max_attempts == 0 {
            return Err(SwarmError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let loop_breaker = LoopBreaker::new(config.loop_breaker)?;
        let executor = ToolExecutor::new(&config.output_dir, config.protected_files.clone());
        let activity_logger = config
            .activity_log
            .then(|| ActivityLogger::new(config.state_dir()));

        Ok(Self {
            client,
            interceptor: UniversalInterceptor::new(&config.interceptor),
            loop_breaker,
            executor,
            generator: ContentGenerator::new(),
            activity_logger,
            usage: Usage::default(),
            config,
        })
    }

    pub fn loop_breaker(&self) -> &LoopBreaker {
        &self.loop_breaker
    }

    pub fn interceptor(&self) -> &UniversalInterceptor {
        &self.interceptor
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Run every task of a plan in order and write the session report
    pub async fn run(&mut self, plan: &Plan) -> Result<SessionReport> {
        plan.validate()?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            "Session {} for '{}': {} tasks with {}",
            session_id,
            plan.project,
            plan.tasks.len(),
            self.client.label()
        );

        if let Some(logger) = &self.activity_logger {
            logger
                .log_session_start(&plan.project, &session_id, plan.tasks.len())
                .await;
        }

        let mut outcomes = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            let role = plan.role_for(&task.agent)?;
            outcomes.push(self.run_task(&plan.project, &role, task).await);
        }

        let report = SessionReport {
            session_id,
            started_at,
            finished_at: Utc::now(),
            project: plan.project.clone(),
            client: self.client.label(),
            outcomes,
            loop_stats: self.loop_breaker.stats(),
            interceptor_stats: self.interceptor.stats().clone(),
            usage: self.usage,
        };

        let path = report.write(&self.config.state_dir())?;
        info!(
            "Session finished: {}/{} tasks succeeded, report at {}",
            report.succeeded(),
            report.outcomes.len(),
            path.display()
        );

        if let Some(logger) = &self.activity_logger {
            logger
                .log_session_complete(report.succeeded(), report.outcomes.len(), &report.usage)
                .await;
        }

        Ok(report)
    }

    /// Run one task through attempts, interventions and the fallback
    pub async fn run_task(&mut self, project: &str, role: &AgentRole, task: &AgentTask) -> TaskOutcome {
        info!("Starting task for {}: {}", task.agent, task.description);
        if let Some(logger) = &self.activity_logger {
            logger.log_task_start(&task.agent, &task.description).await;
        }

        let mut outcome = TaskOutcome {
            agent: task.agent.clone(),
            status: TaskStatus::Failed,
            attempts: 0,
            files: Vec::new(),
            interventions: Vec::new(),
            patched_fields: 0,
            errors: Vec::new(),
        };
        let mut intervention: Option<Intervention> = None;
        let mut last_error: Option<String> = None;
        let mut bypass = false;

        for attempt in 1..=self.config.max_attempts {
            outcome.attempts = attempt;
            info!(
                "{} attempt {}/{}{}",
                task.agent,
                attempt,
                self.config.max_attempts,
                intervention
                    .as_ref()
                    .map(|i| format!(" with {}", i.strategy))
                    .unwrap_or_default()
            );

            let report = self
                .attempt(project, role, task, attempt, intervention.as_ref(), last_error.as_deref())
                .await;
            outcome.patched_fields += report.patched_fields;
            for file in &report.files_written {
                if !outcome.files.contains(file) {
                    outcome.files.push(file.clone());
                }
            }

            if let Some(logger) = &self.activity_logger {
                logger
                    .log_attempt(
                        attempt,
                        &report.files_written,
                        report.patched_fields,
                        report.failure.as_deref(),
                    )
                    .await;
            }

            let Some(failure) = report.failure else {
                self.loop_breaker.record_success(&task.agent);
                outcome.status = if attempt == 1 {
                    TaskStatus::Completed
                } else {
                    TaskStatus::CompletedAfterRetry
                };
                info!("{} completed on attempt {}", task.agent, attempt);
                break;
            };

            warn!("{} attempt {} failed: {}", task.agent, attempt, failure);
            let verdict = self.loop_breaker.record_failure(&task.agent, &failure);
            outcome.errors.push(failure.clone());
            last_error = Some(failure);
            intervention = verdict.intervention;

            if let Some(chosen) = &intervention {
                outcome.interventions.push(chosen.strategy);
                if let Some(logger) = &self.activity_logger {
                    logger.log_intervention(chosen).await;
                }
                if chosen.strategy.bypasses_agent() {
                    warn!("{} bypassed after {} attempts", task.agent, attempt);
                    bypass = true;
                    break;
                }
            }
        }

        if !outcome.status.is_success() {
            if !bypass {
                warn!(
                    "{} exhausted {} attempts, falling back to generated files",
                    task.agent, self.config.max_attempts
                );
            }
            match self.fallback(project, task) {
                Ok(files) => {
                    if let Some(logger) = &self.activity_logger {
                        logger.log_fallback(&files).await;
                    }
                    for file in files {
                        if !outcome.files.contains(&file) {
                            outcome.files.push(file);
                        }
                    }
                    outcome.status = TaskStatus::Fallback;
                }
                Err(e) => {
                    warn!("Fallback for {} failed: {}", task.agent, e);
                    outcome.errors.push(format!("fallback failed: {}", e));
                    outcome.status = TaskStatus::Failed;
                }
            }
        }

        if let Some(logger) = &self.activity_logger {
            logger.log_task_complete(outcome.status, outcome.attempts).await;
        }
        outcome
    }

    async fn attempt(
        &mut self,
        project: &str,
        role: &AgentRole,
        task: &AgentTask,
        attempt: usize,
        intervention: Option<&Intervention>,
        last_error: Option<&str>,
    ) -> AttemptReport {
        let prompt = build_agent_prompt(&PromptInput {
            project,
            task,
            attempt,
            max_attempts: self.config.max_attempts,
            intervention,
            last_error,
        });
        debug!("Prompt for {}: {} chars", task.agent, prompt.len());

        let request = AgentRequest {
            agent: task.agent.clone(),
            system: build_system_prompt(role),
            prompt,
            attempt,
        };

        match self.client.complete(&request).await {
            Ok(response) => self.apply_response(project, task, response),
            Err(e) => {
                let failure = if e.is_transient() {
                    format!("rate limit: {}", e)
                } else {
                    e.to_string()
                };
                AttemptReport {
                    files_written: Vec::new(),
                    patched_fields: 0,
                    failure: Some(failure),
                }
            }
        }
    }

    fn apply_response(&mut self, project: &str, task: &AgentTask, response: AgentResponse) -> AttemptReport {
        if let Some(usage) = &response.usage {
            self.usage.add(usage);
        }

        let calls = if response.tool_calls.is_empty() {
            let parsed = parse_write_blocks(&response.text);
            if !parsed.is_empty() {
                debug!("{} answered with {} XML blocks", task.agent, parsed.len());
            }
            parsed
        } else {
            response.tool_calls.clone()
        };

        let pending = self.missing_files(task);
        let mut ctx = InterceptContext::new(project, &task.agent, &task.description, &pending);
        let interceptions = self.interceptor.intercept_all(&calls, &mut ctx);
        let patched_fields: usize = interceptions.iter().map(|i| i.patched_fields.len()).sum();
        let repaired: Vec<ToolCall> = interceptions
            .into_iter()
            .zip(&calls)
            .map(|(interception, call)| interception.into_call(call.id.clone()))
            .collect();

        let execution = self.executor.execute_all(&repaired, &task.agent);
        debug!("{} execution: {}", task.agent, execution.summary());
        let files_written: Vec<String> = execution.written_files().cloned().collect();

        let mut problems: Vec<String> = Vec::new();
        if calls.is_empty() {
            problems.push("no tool calls in response".to_string());
        }
        if response.was_truncated() {
            problems.push("response stopped at max_tokens".to_string());
        }
        problems.extend(execution.errors.iter().cloned());

        let missing = self.missing_files(task);
        if !missing.is_empty() {
            problems.push(format!("missing expected files: {}", missing.join(", ")));
        }
        if problems.is_empty() && files_written.is_empty() {
            problems.push("no files written".to_string());
        }

        AttemptReport {
            files_written,
            patched_fields,
            failure: (!problems.is_empty()).then(|| problems.join("; ")),
        }
    }

    /// Expected files not present under the output root
    fn missing_files(&self, task: &AgentTask) -> Vec<String> {
        task.expected_files
            .iter()
            .filter(|f| !self.executor.root().join(f.as_str()).is_file())
            .cloned()
            .collect()
    }

    /// Write every missing expected file from templates
    fn fallback(&self, project: &str, task: &AgentTask) -> Result<Vec<String>> {
        let targets = if task.expected_files.is_empty() {
            vec![format!("{}_output.md", task.agent)]
        } else {
            self.missing_files(task)
        };
        let ctx = TemplateContext::new(project, &task.agent, &task.description);

        let mut written = Vec::with_capacity(targets.len());
        for path in targets {
            let content = self.generator.generate(&path, &ctx);
            self.executor.write_file(&path, &content)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use swarmguard_agent::{MockClient, MockReply};
    use swarmguard_core::default_plan;
    use tempfile::TempDir;

    fn orchestrator(client: Arc<MockClient>, dir: &TempDir, max_attempts: usize) -> IntelligentOrchestrator {
        let config = OrchestratorConfig::new(dir.path()).with_max_attempts(max_attempts);
        IntelligentOrchestrator::new(client, config).unwrap()
    }

    fn status_of(report: &SessionReport, agent: &str) -> TaskStatus {
        report
            .outcomes
            .iter()
            .find(|o| o.agent == agent)
            .map(|o| o.status)
            .unwrap()
    }

    #[tokio::test]
    async fn test_scaffolding_run_end_to_end() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::scaffolding());
        let mut orch = orchestrator(mock.clone(), &dir, 4);

        let plan = default_plan("Shop");
        let report = orch.run(&plan).await.unwrap();

        assert_eq!(report.outcomes.len(), 6);
        assert!(!report.any_failed());
        assert_eq!(status_of(&report, "requirements-analyst"), TaskStatus::Completed);
        assert_eq!(status_of(&report, "project-architect"), TaskStatus::Completed);
        assert_eq!(status_of(&report, "rapid-builder"), TaskStatus::Completed);
        assert_eq!(status_of(&report, "frontend-specialist"), TaskStatus::Completed);
        assert_eq!(status_of(&report, "quality-guardian"), TaskStatus::CompletedAfterRetry);
        assert_eq!(status_of(&report, "devops-engineer"), TaskStatus::Fallback);

        for task in &plan.tasks {
            for file in &task.expected_files {
                assert!(dir.path().join(file).is_file(), "{} missing", file);
            }
        }
        assert!(!dir.path().parent().unwrap().join("deploy/Dockerfile").exists());

        // placeholder content was replaced before it reached disk
        let requirements = std::fs::read_to_string(dir.path().join("requirements.txt")).unwrap();
        assert!(requirements.contains("fastapi"));
        assert!(!requirements.contains("TODO"));

        assert_eq!(orch.executor().read_decisions().unwrap().len(), 1);
        assert!(SessionReport::path(&dir.path().join(STATE_DIR)).is_file());
        assert!(dir.path().join(STATE_DIR).join("activity.md").is_file());
        assert_eq!(report.client, "mock");
    }

    #[tokio::test]
    async fn test_looping_agent_gets_rotating_interventions() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::scaffolding());
        let mut orch = orchestrator(mock.clone(), &dir, 4);

        let plan = default_plan("Shop");
        let report = orch.run(&plan).await.unwrap();

        let devops = report
            .outcomes
            .iter()
            .find(|o| o.agent == "devops-engineer")
            .unwrap();
        assert_eq!(devops.attempts, 4);
        assert_eq!(
            devops.interventions,
            vec![
                RecoveryStrategy::ParameterRepair,
                RecoveryStrategy::ExemplarInjection,
                RecoveryStrategy::StructuredOutput,
            ]
        );
        assert_eq!(devops.errors.len(), 4);
        assert!(devops.errors[0].contains("Path traversal"));

        let stats = &report.loop_stats.agents["devops-engineer"];
        assert_eq!(stats.failures, 4);
        assert_eq!(stats.loops_detected, 3);

        let devops_prompts: Vec<_> = mock
            .prompts()
            .into_iter()
            .filter(|p| p.starts_with("# AGENT: devops-engineer"))
            .collect();
        assert_eq!(devops_prompts.len(), 4);
        // an intervention shapes the attempt after the failure that triggered it
        assert!(!devops_prompts[0].contains("RECOVERY INSTRUCTIONS"));
        assert!(!devops_prompts[1].contains("RECOVERY INSTRUCTIONS"));
        assert!(devops_prompts[2].contains("MUST include all of its required parameters"));
        assert!(devops_prompts[3].contains("Copy the shape of this call"));
    }

    #[tokio::test]
    async fn test_retry_prompt_carries_previous_error() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::scaffolding());
        let mut orch = orchestrator(mock.clone(), &dir, 4);
        orch.run(&default_plan("Shop")).await.unwrap();

        let qa_prompts: Vec<_> = mock
            .prompts()
            .into_iter()
            .filter(|p| p.starts_with("# AGENT: quality-guardian"))
            .collect();
        assert_eq!(qa_prompts.len(), 2);
        assert!(qa_prompts[1].contains("PREVIOUS ATTEMPT FAILED"));
        assert!(qa_prompts[1].contains("no tool calls in response"));
        // one failure is not a loop
        assert!(!qa_prompts[1].contains("RECOVERY INSTRUCTIONS"));
    }

    #[tokio::test]
    async fn test_direct_bypass_stops_asking_agent() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::new(MockReply::Fail(
            "invalid tool schema".to_string(),
        )));
        let mut orch = orchestrator(mock.clone(), &dir, 10);

        let plan = Plan {
            project: "Shop".to_string(),
            tasks: vec![AgentTask::new("rapid-builder", "Build it").with_expected_files(["app.py"])],
            agents: Vec::new(),
        };
        let report = orch.run(&plan).await.unwrap();
        let outcome = &report.outcomes[0];

        // threshold 2: loops at attempts 2..=5, the fourth is DirectBypass
        assert_eq!(outcome.attempts, 5);
        assert_eq!(mock.call_count(), 5);
        assert_eq!(outcome.interventions.last(), Some(&RecoveryStrategy::DirectBypass));
        assert_eq!(outcome.status, TaskStatus::Fallback);
        assert_eq!(outcome.files, vec!["app.py".to_string()]);
        assert!(dir.path().join("app.py").is_file());
    }

    #[tokio::test]
    async fn test_rate_limit_consumes_attempt() {
        let dir = TempDir::new().unwrap();
        let good = AgentResponse::tools(vec![ToolCall::write_file("w1", "app.py", "app = 1\n")]);
        let mock = Arc::new(
            MockClient::new(MockReply::Respond(good))
                .with_rule_times("rapid-builder", MockReply::Limit("slow down".to_string()), 1),
        );
        let mut orch = orchestrator(mock, &dir, 4);

        let plan = Plan {
            project: "Shop".to_string(),
            tasks: vec![AgentTask::new("rapid-builder", "Build it").with_expected_files(["app.py"])],
            agents: Vec::new(),
        };
        let report = orch.run(&plan).await.unwrap();
        let outcome = &report.outcomes[0];

        assert_eq!(outcome.status, TaskStatus::CompletedAfterRetry);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.errors[0].starts_with("rate limit"));
        assert!(!orch.loop_breaker().is_looping("rapid-builder"));
    }

    #[tokio::test]
    async fn test_retry_repairs_path_to_file_still_missing() {
        let dir = TempDir::new().unwrap();
        let first = AgentResponse::tools(vec![
            ToolCall::write_file("w1", "backend/main.py", "app = FastAPI()\n"),
            ToolCall::write_file("w2", "backend/models.py", "class Item: pass\n"),
        ]);
        let mut pathless = Map::new();
        pathless.insert("content".to_string(), Value::String("fastapi>=0.110\n".to_string()));
        let second = AgentResponse::tools(vec![ToolCall::new("w3", "write_file", pathless)]);
        let mock = Arc::new(
            MockClient::new(MockReply::Respond(second))
                .with_rule_times("Attempt 1 of", MockReply::Respond(first), 1),
        );
        let mut orch = orchestrator(mock, &dir, 4);

        let plan = Plan {
            project: "Shop".to_string(),
            tasks: vec![AgentTask::new("rapid-builder", "Build the API").with_expected_files([
                "backend/main.py",
                "backend/models.py",
                "requirements.txt",
            ])],
            agents: Vec::new(),
        };
        let report = orch.run(&plan).await.unwrap();

        assert_eq!(report.outcomes[0].status, TaskStatus::CompletedAfterRetry);
        let main = std::fs::read_to_string(dir.path().join("backend/main.py")).unwrap();
        assert_eq!(main, "app = FastAPI()\n");
        let reqs = std::fs::read_to_string(dir.path().join("requirements.txt")).unwrap();
        assert_eq!(reqs, "fastapi>=0.110\n");
    }

    #[tokio::test]
    async fn test_task_without_expected_files_falls_back_to_output_file() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::new(MockReply::Respond(AgentResponse::text(
            "Nothing to write.",
        ))));
        let mut orch = orchestrator(mock, &dir, 1);

        let plan = Plan {
            project: "Shop".to_string(),
            tasks: vec![AgentTask::new("doc-writer", "Summarize the project")],
            agents: vec![AgentRole::new("doc-writer", "You write docs.")],
        };
        let report = orch.run(&plan).await.unwrap();

        assert_eq!(report.outcomes[0].status, TaskStatus::Fallback);
        assert!(dir.path().join("doc-writer_output.md").is_file());
    }

    #[tokio::test]
    async fn test_unwritable_fallback_fails_task() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::new(MockReply::Respond(AgentResponse::text("no"))));
        let mut orch = orchestrator(mock, &dir, 1);

        let plan = Plan {
            project: "Shop".to_string(),
            tasks: vec![AgentTask::new("rapid-builder", "Escape").with_expected_files(["../escape.txt"])],
            agents: Vec::new(),
        };
        let report = orch.run(&plan).await.unwrap();

        assert_eq!(report.outcomes[0].status, TaskStatus::Failed);
        assert!(report.any_failed());
        assert!(report.outcomes[0].errors.last().unwrap().starts_with("fallback failed"));
    }

    #[tokio::test]
    async fn test_report_roundtrips_from_disk() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::scaffolding());
        let mut orch = orchestrator(mock, &dir, 4);
        let report = orch.run(&default_plan("Shop")).await.unwrap();

        let loaded = SessionReport::load(&SessionReport::path(&dir.path().join(STATE_DIR))).unwrap();
        assert_eq!(loaded.session_id, report.session_id);
        assert_eq!(loaded.outcomes.len(), 6);
        assert_eq!(loaded.interceptor_stats, report.interceptor_stats);
        assert!(loaded.interceptor_stats.patched_calls >= 3);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockClient::scaffolding());
        let config = OrchestratorConfig::new(dir.path()).with_max_attempts(0);
        assert!(IntelligentOrchestrator::new(mock, config).is_err());
    }
}
