//! Loop detection and recovery strategy selection
//!
//! Every failed agent attempt is reduced to a signature: the known error
//! phrases it contains, or a normalized form of the text when none match.
//! Each agent keeps a bounded window of recent signatures. When one
//! signature fills `threshold` slots of the window, the agent is looping and
//! the next recovery strategy for that agent is chosen round-robin.
//!
//! ```text
//!   failure ──classify──▶ signature ──window──▶ count >= threshold?
//!                                                 │ no: plain retry
//!                                                 │ yes
//!                                                 ▼
//!            ParameterRepair → ExemplarInjection → StructuredOutput → DirectBypass → …
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, VecDeque};
use swarmguard_agent::structured_output_instructions;
use swarmguard_core::config::LoopBreakerConfig;
use swarmguard_core::{Result, SwarmError};

/// Broad class of an agent failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingParameter,
    PlaceholderContent,
    InvalidTool,
    MissingFiles,
    RateLimited,
    Timeout,
    MalformedOutput,
    EmptyResponse,
    FileSystem,
    Truncated,
    Unknown,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingParameter => "missing_parameter",
            Self::PlaceholderContent => "placeholder_content",
            Self::InvalidTool => "invalid_tool",
            Self::MissingFiles => "missing_files",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::MalformedOutput => "malformed_output",
            Self::EmptyResponse => "empty_response",
            Self::FileSystem => "file_system",
            Self::Truncated => "truncated",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Known error phrases, in classification priority order
const KNOWN_PHRASES: &[(&str, FailureKind)] = &[
    ("missing required parameter", FailureKind::MissingParameter),
    ("required parameter", FailureKind::MissingParameter),
    ("placeholder", FailureKind::PlaceholderContent),
    ("unknown tool", FailureKind::InvalidTool),
    ("invalid tool", FailureKind::InvalidTool),
    ("missing expected files", FailureKind::MissingFiles),
    ("rate limit", FailureKind::RateLimited),
    ("circuit breaker", FailureKind::RateLimited),
    ("429", FailureKind::RateLimited),
    ("timed out", FailureKind::Timeout),
    ("timeout", FailureKind::Timeout),
    ("invalid json", FailureKind::MalformedOutput),
    ("failed to parse", FailureKind::MalformedOutput),
    ("empty response", FailureKind::EmptyResponse),
    ("no tool calls", FailureKind::EmptyResponse),
    ("permission denied", FailureKind::FileSystem),
    ("no such file", FailureKind::FileSystem),
    ("path traversal", FailureKind::FileSystem),
    ("absolute paths not allowed", FailureKind::FileSystem),
    ("protected file", FailureKind::FileSystem),
    ("max_tokens", FailureKind::Truncated),
];

/// Characters of normalized text hashed when no phrase matches
const NORMALIZED_PREFIX_CHARS: usize = 120;

/// Result of classifying one error text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureClassification {
    pub kind: FailureKind,
    /// Matched known phrases, sorted and de-duplicated
    pub matched: Vec<&'static str>,
    /// Stable short hash identifying "the same failure"
    pub signature: String,
}

/// Classify an error text and compute its signature
pub fn classify_failure(error: &str) -> FailureClassification {
    let lower = error.to_lowercase();

    let mut kind = FailureKind::Unknown;
    let mut matched = Vec::new();
    for (phrase, phrase_kind) in KNOWN_PHRASES {
        if lower.contains(phrase) {
            if matched.is_empty() {
                kind = *phrase_kind;
            }
            matched.push(*phrase);
        }
    }
    matched.sort_unstable();
    matched.dedup();

    let basis = if matched.is_empty() {
        normalize(&lower)
    } else {
        matched.join("|")
    };

    FailureClassification {
        kind,
        matched,
        signature: hash_signature(&basis),
    }
}

/// Lowercased text without digits, whitespace collapsed, truncated
fn normalize(lower: &str) -> String {
    lower
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(NORMALIZED_PREFIX_CHARS)
        .collect()
}

fn hash_signature(basis: &str) -> String {
    let digest = Sha256::digest(basis.as_bytes());
    hex::encode(&digest[..8])
}

/// The four recovery strategies, applied round-robin per agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Spell out the required parameters of each tool
    ParameterRepair,
    /// Show a complete, correct tool call to copy
    ExemplarInjection,
    /// Stop using tools, write XML blocks in text instead
    StructuredOutput,
    /// Stop asking the agent; the harness writes the files itself
    DirectBypass,
}

impl RecoveryStrategy {
    pub const ROTATION: [RecoveryStrategy; 4] = [
        RecoveryStrategy::ParameterRepair,
        RecoveryStrategy::ExemplarInjection,
        RecoveryStrategy::StructuredOutput,
        RecoveryStrategy::DirectBypass,
    ];

    /// Instruction prepended to the agent's next prompt
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::ParameterRepair => {
                "Your previous attempts failed the same way more than once. Every tool call MUST \
                 include all of its required parameters with real values:\n\
                 - write_file: file_path (relative path) AND content (the complete file text)\n\
                 - create_directory: path\n\
                 - record_decision: decision AND rationale\n\
                 - complete_task: summary\n\
                 Never send empty strings, ellipses or TODO markers as parameter values."
            }
            Self::ExemplarInjection => {
                "Your previous attempts kept failing. Copy the shape of this call exactly, once per \
                 expected file, replacing the values with the real path and complete content:\n\n\
                 {\"name\": \"write_file\", \"input\": {\"file_path\": \"backend/main.py\", \
                 \"content\": \"from fastapi import FastAPI\\n\\napp = FastAPI()\\n\"}}"
            }
            Self::StructuredOutput => {
                "Tool calls from you keep failing. Switch output format for this attempt."
            }
            Self::DirectBypass => {
                "The harness will create the expected files directly. Reply with a short summary \
                 of what the files should contain and call complete_task."
            }
        }
    }

    /// Whether this strategy replaces the agent instead of re-prompting it
    pub fn bypasses_agent(&self) -> bool {
        matches!(self, Self::DirectBypass)
    }
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ParameterRepair => "parameter_repair",
            Self::ExemplarInjection => "exemplar_injection",
            Self::StructuredOutput => "structured_output",
            Self::DirectBypass => "direct_bypass",
        };
        write!(f, "{}", s)
    }
}

/// A chosen recovery, ready to be applied to the next attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub strategy: RecoveryStrategy,
    pub instruction: String,
    pub kind: FailureKind,
    pub signature: String,
    pub occurrences: usize,
}

impl Intervention {
    fn new(strategy: RecoveryStrategy, classification: &FailureClassification, occurrences: usize) -> Self {
        let mut instruction = strategy.instruction().to_string();
        if strategy == RecoveryStrategy::StructuredOutput {
            instruction.push_str("\n\n");
            instruction.push_str(structured_output_instructions());
        }
        Self {
            strategy,
            instruction,
            kind: classification.kind,
            signature: classification.signature.clone(),
            occurrences,
        }
    }
}

/// Outcome of recording one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopVerdict {
    pub kind: FailureKind,
    pub signature: String,
    /// Occurrences of this signature in the agent's window, including this one
    pub occurrences: usize,
    /// Set when the failure completes a loop
    pub intervention: Option<Intervention>,
}

impl LoopVerdict {
    pub fn is_loop(&self) -> bool {
        self.intervention.is_some()
    }
}

/// Per-agent counters for reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLoopStats {
    pub failures: usize,
    pub loops_detected: usize,
    pub interventions: BTreeMap<RecoveryStrategy, usize>,
    pub currently_looping: bool,
}

/// Snapshot of the loop breaker for reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopBreakerStats {
    pub threshold: usize,
    pub history_size: usize,
    pub agents: BTreeMap<String, AgentLoopStats>,
}

#[derive(Debug, Default)]
struct AgentWindow {
    window: VecDeque<String>,
    counts: HashMap<String, usize>,
    cursor: usize,
    failures: usize,
    loops_detected: usize,
    interventions: BTreeMap<RecoveryStrategy, usize>,
}

impl AgentWindow {
    fn clear_window(&mut self) {
        self.window.clear();
        self.counts.clear();
        self.cursor = 0;
    }

    fn max_count(&self) -> usize {
        self.counts.values().copied().max().unwrap_or(0)
    }
}

/// Per-agent loop detector
#[derive(Debug)]
pub struct LoopBreaker {
    threshold: usize,
    history_size: usize,
    agents: HashMap<String, AgentWindow>,
}

impl LoopBreaker {
    /// Create a loop breaker; threshold must be >= 1 and fit in the window
    pub fn new(config: LoopBreakerConfig) -> Result<Self> {
        if config.threshold == 0 {
            return Err(SwarmError::LoopBreaker("threshold must be at least 1".to_string()));
        }
        if config.history_size < config.threshold {
            return Err(SwarmError::LoopBreaker(format!(
                "history size {} cannot hold threshold {}",
                config.history_size, config.threshold
            )));
        }
        Ok(Self {
            threshold: config.threshold,
            history_size: config.history_size,
            agents: HashMap::new(),
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Record a failed attempt and decide whether to intervene
    pub fn record_failure(&mut self, agent: &str, error: &str) -> LoopVerdict {
        let classification = classify_failure(error);
        let state = self.agents.entry(agent.to_string()).or_default();
        state.failures += 1;

        if state.window.len() == self.history_size {
            if let Some(evicted) = state.window.pop_front() {
                if let Some(count) = state.counts.get_mut(&evicted) {
                    *count -= 1;
                    if *count == 0 {
                        state.counts.remove(&evicted);
                    }
                }
            }
        }
        state.window.push_back(classification.signature.clone());
        let occurrences = {
            let count = state.counts.entry(classification.signature.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let intervention = if occurrences >= self.threshold {
            let strategy = RecoveryStrategy::ROTATION[state.cursor % RecoveryStrategy::ROTATION.len()];
            state.cursor += 1;
            state.loops_detected += 1;
            *state.interventions.entry(strategy).or_insert(0) += 1;

            tracing::warn!(
                "Loop detected for {}: {} x{} ({}), applying {}",
                agent,
                classification.kind,
                occurrences,
                classification.signature,
                strategy
            );
            Some(Intervention::new(strategy, &classification, occurrences))
        } else {
            tracing::debug!(
                "{} failure {} ({}) seen {}/{}",
                agent,
                classification.kind,
                classification.signature,
                occurrences,
                self.threshold
            );
            None
        };

        LoopVerdict {
            kind: classification.kind,
            signature: classification.signature,
            occurrences,
            intervention,
        }
    }

    /// Record a successful attempt: the agent is no longer stuck
    pub fn record_success(&mut self, agent: &str) {
        if let Some(state) = self.agents.get_mut(agent) {
            state.clear_window();
        }
    }

    /// Whether any signature in the agent's window has reached the threshold
    pub fn is_looping(&self, agent: &str) -> bool {
        self.agents
            .get(agent)
            .map(|s| s.max_count() >= self.threshold)
            .unwrap_or(false)
    }

    /// Forget everything about an agent
    pub fn reset(&mut self, agent: &str) {
        self.agents.remove(agent);
    }

    pub fn stats(&self) -> LoopBreakerStats {
        let agents = self
            .agents
            .iter()
            .map(|(name, state)| {
                (
                    name.clone(),
                    AgentLoopStats {
                        failures: state.failures,
                        loops_detected: state.loops_detected,
                        interventions: state.interventions.clone(),
                        currently_looping: state.max_count() >= self.threshold,
                    },
                )
            })
            .collect();

        LoopBreakerStats {
            threshold: self.threshold,
            history_size: self.history_size,
            agents,
        }
    }
}

impl Default for LoopBreaker {
    fn default() -> Self {
        Self {
            threshold: LoopBreakerConfig::default().threshold,
            history_size: LoopBreakerConfig::default().history_size,
            agents: HashMap::new(),
        }
    }
}
