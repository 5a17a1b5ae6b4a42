//! swarmguard CLI - agent orchestration with loop detection
//!
//! Usage:
//!   swarmguard init [path]          Write default .swarmguard/config.toml
//!   swarmguard run [--mock]         Run a plan against the LLM (or the mock)
//!   swarmguard agents               List the agent roster
//!   swarmguard classify <error>     Show failure kind and loop signature
//!   swarmguard template <path>      Print the fallback content for a path

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swarmguard_agent::{get_auth_token, AnthropicClient, LlmClient, MockClient, Model};
use swarmguard_core::{builtin_roster, default_plan, AgentRole, Plan, SwarmConfig};
use swarmguard_orchestrator::{
    classify_failure, kind_for, ContentGenerator, IntelligentOrchestrator, OrchestratorConfig,
    SessionReport, TemplateContext,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_PROJECT: &str = "demo-app";

#[derive(Parser)]
#[command(name = "swarmguard")]
#[command(author, version, about = "Multi-agent scaffolding with loop detection and recovery")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run a plan
    Run {
        /// Plan file (.toml or .json); the builtin plan when omitted
        #[arg(long, value_name = "FILE")]
        plan: Option<PathBuf>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the scripted mock instead of the API
        #[arg(long)]
        mock: bool,

        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<CliModel>,

        /// Attempts per task (overrides config)
        #[arg(long)]
        max_attempts: Option<usize>,

        /// Project name (overrides the plan's)
        #[arg(long)]
        project: Option<String>,

        /// Print the session report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the agent roster
    Agents {
        /// Include custom agents from a plan file
        #[arg(long, value_name = "FILE")]
        plan: Option<PathBuf>,
    },

    /// Classify an error text the way the loop breaker does
    Classify {
        /// Error text
        error: String,
    },

    /// Print the generated fallback content for a path
    Template {
        /// Relative file path
        path: String,

        /// Project name used in the template
        #[arg(long, default_value = DEFAULT_PROJECT)]
        project: String,
    },
}

/// CLI-friendly model enum
#[derive(Clone, Copy, ValueEnum)]
enum CliModel {
    Opus,
    Sonnet,
    Haiku,
}

impl From<CliModel> for Model {
    fn from(m: CliModel) -> Self {
        match m {
            CliModel::Opus => Model::Opus,
            CliModel::Sonnet => Model::Sonnet,
            CliModel::Haiku => Model::Haiku,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(&path),
        Commands::Run {
            plan,
            output,
            mock,
            model,
            max_attempts,
            project,
            json,
        } => {
            cmd_run(RunArgs {
                plan,
                output,
                mock,
                model,
                max_attempts,
                project,
                json,
            })
            .await
        }
        Commands::Agents { plan } => cmd_agents(plan.as_deref()),
        Commands::Classify { error } => cmd_classify(&error),
        Commands::Template { path, project } => cmd_template(&path, &project),
    }
}

fn cmd_init(path: &Path) -> Result<()> {
    info!("Initializing swarmguard in {}", path.display());

    let config_path = SwarmConfig::path(path);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let written = SwarmConfig::write_default(path)
        .with_context(|| format!("Failed to write config under {}", path.display()))?;
    println!("Wrote {}", written.display());
    Ok(())
}

struct RunArgs {
    plan: Option<PathBuf>,
    output: Option<PathBuf>,
    mock: bool,
    model: Option<CliModel>,
    max_attempts: Option<usize>,
    project: Option<String>,
    json: bool,
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let settings = SwarmConfig::load_or_default(Path::new(".")).context("Failed to load config")?;

    let mut plan = match &args.plan {
        Some(path) => {
            Plan::load(path).with_context(|| format!("Failed to load plan {}", path.display()))?
        }
        None => default_plan(args.project.as_deref().unwrap_or(DEFAULT_PROJECT)),
    };
    if let Some(project) = args.project {
        plan.project = project;
    }

    let mut config = OrchestratorConfig::from_settings(&settings);
    if let Some(output) = args.output {
        config = config.with_output_dir(output);
    }
    if let Some(max_attempts) = args.max_attempts {
        config = config.with_max_attempts(max_attempts);
    }

    let client: Arc<dyn LlmClient> = if args.mock {
        Arc::new(MockClient::scaffolding())
    } else {
        let model = match args.model {
            Some(m) => Model::from(m),
            None => settings
                .models
                .default
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid models.default in config: {}", e))?,
        };
        get_auth_token(&settings.models.api_key_env).context("No API credentials found")?;
        Arc::new(
            AnthropicClient::new(model)
                .with_max_tokens(settings.models.max_tokens)
                .with_api_key_env(settings.models.api_key_env.clone()),
        )
    };

    let output_dir = config.output_dir.clone();
    let mut orchestrator =
        IntelligentOrchestrator::new(client, config).context("Invalid orchestrator settings")?;
    let report = orchestrator.run(&plan).await.context("Run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &output_dir);
    }

    let failed = report.outcomes.len() - report.succeeded();
    if failed > 0 {
        bail!("{} task(s) failed", failed);
    }
    Ok(())
}

fn print_summary(report: &SessionReport, output_dir: &Path) {
    println!("Session {} ({})", report.session_id, report.client);
    println!("Project: {}", report.project);
    println!();
    println!(
        "{:<24} {:<22} {:>8} {:>7} {:>13}",
        "AGENT", "STATUS", "ATTEMPTS", "FILES", "INTERVENTIONS"
    );
    for outcome in &report.outcomes {
        println!(
            "{:<24} {:<22} {:>8} {:>7} {:>13}",
            outcome.agent,
            outcome.status.to_string(),
            outcome.attempts,
            outcome.files.len(),
            outcome.interventions.len()
        );
    }
    println!();
    println!(
        "{}/{} tasks succeeded, {} calls patched, {} tokens in / {} out",
        report.succeeded(),
        report.outcomes.len(),
        report.interceptor_stats.patched_calls,
        report.usage.input_tokens,
        report.usage.output_tokens
    );
    println!("Output: {}", output_dir.display());
}

fn cmd_agents(plan: Option<&Path>) -> Result<()> {
    let roster: Vec<AgentRole> = match plan {
        Some(path) => Plan::load(path)
            .with_context(|| format!("Failed to load plan {}", path.display()))?
            .roster(),
        None => builtin_roster(),
    };

    for role in roster {
        println!("{}", role.name);
        println!("  {}", role.prompt);
    }
    Ok(())
}

fn cmd_classify(error: &str) -> Result<()> {
    let classification = classify_failure(error);
    println!("kind:      {}", classification.kind);
    println!("signature: {}", classification.signature);
    if classification.matched.is_empty() {
        println!("matched:   (none, signature from normalized text)");
    } else {
        println!("matched:   {}", classification.matched.join(", "));
    }
    Ok(())
}

fn cmd_template(path: &str, project: &str) -> Result<()> {
    let ctx = TemplateContext::new(project, "cli", format!("Template preview for {}", path));
    info!("Template kind for {}: {:?}", path, kind_for(path));
    print!("{}", ContentGenerator::new().generate(path, &ctx));
    Ok(())
}
