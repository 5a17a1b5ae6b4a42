//! Activity Logger - Human-readable run logging to `.swarmguard/activity.md`
//!
//! Records what happened to every task:
//! - Session start
//! - Attempts with their outcome and patched fields
//! - Detected loops and the strategy applied
//! - Fallbacks
//! - Final summary with token usage

use chrono::Utc;
use std::path::PathBuf;
use swarmguard_agent::Usage;
use swarmguard_core::fail_open::fail_open;
use swarmguard_core::{Result, TaskStatus};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::loop_breaker::Intervention;

/// Maximum characters of an error quoted in the log
const ERROR_PREVIEW_CHARS: usize = 300;

/// Activity logger for one session
pub struct ActivityLogger {
    output_path: PathBuf,
}

impl ActivityLogger {
    /// Create a logger writing `activity.md` under `state_dir`
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            output_path: state_dir.join("activity.md"),
        }
    }

    /// Start a fresh log for a session
    pub async fn log_session_start(&self, project: &str, session_id: &str, tasks: usize) {
        fail_open("activity_logger::log_session_start", || async {
            let content = format!(
                "# swarmguard Activity Log\n\n## Project: {}\n**Session**: {}\n**Started**: {}\n**Tasks**: {}\n\n---\n\n",
                project,
                session_id,
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                tasks
            );
            self.create_internal(&content).await
        })
        .await;
    }

    /// Log the start of a task
    pub async fn log_task_start(&self, agent: &str, description: &str) {
        fail_open("activity_logger::log_task_start", || async {
            let content = format!(
                "### {}\n{}\n\n",
                agent,
                description.lines().next().unwrap_or(description)
            );
            self.append_internal(&content).await
        })
        .await;
    }

    /// Log one attempt and its result
    pub async fn log_attempt(
        &self,
        attempt: usize,
        files_written: &[String],
        patched_fields: usize,
        error: Option<&str>,
    ) {
        fail_open("activity_logger::log_attempt", || async {
            let mut content = match error {
                None => format!("- Attempt {}: ok", attempt),
                Some(_) => format!("- Attempt {}: failed", attempt),
            };
            if !files_written.is_empty() {
                content.push_str(&format!(" ({})", files_written.join(", ")));
            }
            if patched_fields > 0 {
                content.push_str(&format!(", {} fields patched", patched_fields));
            }
            content.push('\n');
            if let Some(error) = error {
                content.push_str(&format!("  > {}\n", preview(error)));
            }
            self.append_internal(&content).await
        })
        .await;
    }

    /// Log a detected loop and the chosen strategy
    pub async fn log_intervention(&self, intervention: &Intervention) {
        fail_open("activity_logger::log_intervention", || async {
            let content = format!(
                "- **Loop** `{}` ({}) x{} -> {}\n",
                intervention.signature,
                intervention.kind,
                intervention.occurrences,
                intervention.strategy
            );
            self.append_internal(&content).await
        })
        .await;
    }

    /// Log a fallback to generated files
    pub async fn log_fallback(&self, files: &[String]) {
        fail_open("activity_logger::log_fallback", || async {
            let content = format!("- **Fallback** wrote {}\n", files.join(", "));
            self.append_internal(&content).await
        })
        .await;
    }

    /// Log the final status of a task
    pub async fn log_task_complete(&self, status: TaskStatus, attempts: usize) {
        fail_open("activity_logger::log_task_complete", || async {
            let content = format!("\n**Status**: {} after {} attempts\n\n---\n\n", status, attempts);
            self.append_internal(&content).await
        })
        .await;
    }

    /// Log the session summary
    pub async fn log_session_complete(&self, succeeded: usize, total: usize, usage: &Usage) {
        fail_open("activity_logger::log_session_complete", || async {
            let icon = if succeeded == total { "✓" } else { "✗" };
            let content = format!(
                "## Session Summary\n\n\
                **Completed**: {}\n\
                **Tasks**: {} {}/{} succeeded\n\
                **Tokens**: {} input, {} output\n",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                icon,
                succeeded,
                total,
                usage.input_tokens,
                usage.output_tokens
            );
            self.append_internal(&content).await
        })
        .await;
    }

    /// Create or truncate the log with a header (internal, returns Result for fail_open)
    async fn create_internal(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.output_path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Append content to the activity log (internal, returns Result for fail_open)
    async fn append_internal(&self, content: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn preview(error: &str) -> String {
    let flat = error.replace('\n', " ");
    if flat.chars().count() > ERROR_PREVIEW_CHARS {
        let truncated: String = flat.chars().take(ERROR_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        flat
    }
}
