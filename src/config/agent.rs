use std::time::Duration;

use crate::config::helpers::{parse_optional_env, parse_string_env};
use crate::error::ConfigError;

/// Run orchestration and command routing configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Delay between two status fetches while a run is queued or in progress.
    pub poll_interval: Duration,
    /// Maximum number of waits before a run is reported as timed out.
    pub max_poll_attempts: u32,
    /// Maximum tool-output submissions for a single run.
    pub max_tool_rounds: usize,
    /// Marker that distinguishes commands from ordinary chat.
    pub command_prefix: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "vaultclaw".to_string(),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 600,
            max_tool_rounds: 10,
            command_prefix: "!".to_string(),
        }
    }
}

impl AgentConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let command_prefix = parse_string_env("COMMAND_PREFIX", defaults.command_prefix)?;
        if command_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "COMMAND_PREFIX".to_string(),
                message: "must not be blank".to_string(),
            });
        }

        Ok(Self {
            name: parse_string_env("AGENT_NAME", defaults.name)?,
            poll_interval: Duration::from_millis(parse_optional_env(
                "RUN_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            max_poll_attempts: parse_optional_env(
                "RUN_MAX_POLL_ATTEMPTS",
                defaults.max_poll_attempts,
            )?,
            max_tool_rounds: parse_optional_env("RUN_MAX_TOOL_ROUNDS", defaults.max_tool_rounds)?,
            command_prefix,
        })
    }
}
