//! # swarmguard-orchestrator
//!
//! Task orchestration with loop detection for swarmguard.
//!
//! This crate provides:
//! - Content templates for files agents fail to deliver
//! - The universal interceptor that repairs tool-call parameters
//! - The loop breaker that spots repeated failures and picks recovery strategies
//! - The tool executor, prompt builder and activity log
//! - The orchestrator that ties them together per plan

mod activity_logger;
pub mod content;
mod executor;
pub mod interceptor;
pub mod loop_breaker;
mod orchestrator;
mod prompt;

pub use activity_logger::ActivityLogger;
pub use content::{kind_for, ContentGenerator, TemplateContext, TemplateKind};
pub use executor::{DecisionRecord, ExecutionResult, ToolExecutor, ToolOutcome};
pub use interceptor::{
    is_placeholder, InterceptContext, InterceptRecord, Interception, InterceptorStats,
    UniversalInterceptor,
};
pub use loop_breaker::{
    classify_failure, AgentLoopStats, FailureClassification, FailureKind, Intervention,
    LoopBreaker, LoopBreakerStats, LoopVerdict, RecoveryStrategy,
};
pub use orchestrator::{IntelligentOrchestrator, OrchestratorConfig, SessionReport, TaskOutcome};
pub use prompt::{build_agent_prompt, build_system_prompt, tool_instructions, PromptInput};
