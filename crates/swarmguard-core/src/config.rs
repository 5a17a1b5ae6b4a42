//! Configuration management for swarmguard
//!
//! Repository-level settings for the loop breaker, orchestrator retries,
//! the parameter interceptor, and model selection.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, SwarmError};

/// Directory holding config, reports and logs
pub const STATE_DIR: &str = ".swarmguard";

/// Repository-level swarmguard configuration
///
/// Loaded from `.swarmguard/config.toml` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Files/directories that agents cannot write
    #[serde(default = "default_protected_files")]
    pub protected_files: Vec<String>,

    /// Loop detection settings
    #[serde(default)]
    pub loop_breaker: LoopBreakerConfig,

    /// Retry and output settings
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    /// Tool-call parameter patching
    #[serde(default)]
    pub interceptor: InterceptorConfig,

    /// Model selection
    #[serde(default)]
    pub models: ModelConfig,
}

/// Loop detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopBreakerConfig {
    /// Occurrences of one signature in the window that count as a loop
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Recent failure signatures remembered per agent
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Orchestrator retry and output parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Attempts per task before falling back to direct file creation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Where generated files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Interceptor parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterceptorConfig {
    /// Placeholder phrases on top of the builtin list
    #[serde(default)]
    pub extra_placeholders: Vec<String>,

    /// Maximum interception records kept in memory
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model to use
    #[serde(default = "default_model")]
    pub default: String,

    /// Environment variable containing API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

// Default value providers
fn default_protected_files() -> Vec<String> {
    vec![
        ".git".to_string(),
        ".env".to_string(),
        "Cargo.lock".to_string(),
        ".secrets".to_string(),
        STATE_DIR.to_string(),
    ]
}

fn default_threshold() -> usize {
    2
}

fn default_history_size() -> usize {
    10
}

fn default_max_attempts() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_history_limit() -> usize {
    1000
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> usize {
    8000
}

impl SwarmConfig {
    /// Path of the config file under a project root
    pub fn path(root: &Path) -> PathBuf {
        root.join(STATE_DIR).join("config.toml")
    }

    /// Load configuration from `.swarmguard/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = Self::path(root);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| SwarmError::Config(format!("Failed to parse config file: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.swarmguard/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_dir = root.join(STATE_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = Self::path(root);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| SwarmError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Reject settings the loop breaker and orchestrator cannot work with
    pub fn validate(&self) -> Result<()> {
        let lb = &self.loop_breaker;
        if lb.threshold == 0 {
            return Err(SwarmError::Config(
                "loop_breaker.threshold must be at least 1".to_string(),
            ));
        }
        if lb.history_size < lb.threshold {
            return Err(SwarmError::Config(format!(
                "loop_breaker.history_size ({}) must be >= threshold ({})",
                lb.history_size, lb.threshold
            )));
        }
        if self.orchestrator.max_attempts == 0 {
            return Err(SwarmError::Config(
                "orchestrator.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            protected_files: default_protected_files(),
            loop_breaker: LoopBreakerConfig::default(),
            orchestrator: OrchestratorSettings::default(),
            interceptor: InterceptorConfig {
                extra_placeholders: Vec::new(),
                history_limit: default_history_limit(),
            },
            models: ModelConfig::default(),
        }
    }
}

impl Default for LoopBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            history_size: default_history_size(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SwarmConfig::default();
        assert_eq!(config.loop_breaker.threshold, 2);
        assert_eq!(config.loop_breaker.history_size, 10);
        assert_eq!(config.orchestrator.max_attempts, 4);
        assert!(config.protected_files.contains(&".git".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SwarmConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.orchestrator.max_attempts, 4);
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = SwarmConfig::write_default(dir.path()).unwrap();
        assert!(path.ends_with(".swarmguard/config.toml"));

        let config = SwarmConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.models.default, "sonnet");
        assert_eq!(config.interceptor.history_limit, 1000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            SwarmConfig::path(dir.path()),
            "[loop_breaker]\nthreshold = 3\n",
        )
        .unwrap();

        let config = SwarmConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.loop_breaker.threshold, 3);
        assert_eq!(config.loop_breaker.history_size, 10);
        assert_eq!(config.orchestrator.max_attempts, 4);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            SwarmConfig::path(dir.path()),
            "[loop_breaker]\nthreshold = 5\nhistory_size = 3\n",
        )
        .unwrap();

        let result = SwarmConfig::load_or_default(dir.path());
        assert!(matches!(result, Err(SwarmError::Config(_))));
    }
}
