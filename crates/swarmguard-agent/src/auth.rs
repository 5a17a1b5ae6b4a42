//! Authentication for Anthropic API
//!
//! Supports two authentication methods:
//! 1. Claude Code OAuth token (CLAUDE_CODE_OAUTH_TOKEN)
//! 2. An API key from a configurable environment variable (ANTHROPIC_API_KEY by default)

use std::env;
use swarmguard_core::{Result, SwarmError};

const OAUTH_TOKEN_ENV: &str = "CLAUDE_CODE_OAUTH_TOKEN";

/// Get authentication token for Anthropic API
///
/// Priority:
/// 1. CLAUDE_CODE_OAUTH_TOKEN
/// 2. `api_key_env`
pub fn get_auth_token(api_key_env: &str) -> Result<String> {
    if let Ok(oauth_token) = env::var(OAUTH_TOKEN_ENV) {
        tracing::info!("Using Claude Code OAuth token");
        return Ok(oauth_token);
    }

    match env::var(api_key_env) {
        Ok(api_key) if !api_key.trim().is_empty() => {
            tracing::info!("Using {}", api_key_env);
            Ok(api_key)
        }
        _ => Err(SwarmError::Auth(format!(
            "No authentication found. Set either:\n\
             - {}=sk-ant-oat01-...\n\
             - {}=sk-ant-api03-...\n\
             or run with --mock",
            OAUTH_TOKEN_ENV, api_key_env
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap();

        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        let result = f();

        for (key, original) in originals {
            match original {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        result
    }

    #[test]
    fn test_oauth_token_priority() {
        with_env_vars(
            &[
                (OAUTH_TOKEN_ENV, Some("test-oauth")),
                ("SWARMGUARD_TEST_KEY_A", Some("test-api-key")),
            ],
            || {
                assert_eq!(get_auth_token("SWARMGUARD_TEST_KEY_A").unwrap(), "test-oauth");
            },
        );
    }

    #[test]
    fn test_custom_key_env() {
        with_env_vars(
            &[
                (OAUTH_TOKEN_ENV, None),
                ("SWARMGUARD_TEST_KEY_B", Some("custom-key")),
            ],
            || {
                assert_eq!(get_auth_token("SWARMGUARD_TEST_KEY_B").unwrap(), "custom-key");
            },
        );
    }

    #[test]
    fn test_blank_key_rejected() {
        with_env_vars(
            &[
                (OAUTH_TOKEN_ENV, None),
                ("SWARMGUARD_TEST_KEY_C", Some("   ")),
            ],
            || {
                let result = get_auth_token("SWARMGUARD_TEST_KEY_C");
                assert!(matches!(result, Err(SwarmError::Auth(_))));
            },
        );
    }
}
