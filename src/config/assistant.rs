use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_optional_env, parse_string_env, required_env};
use crate::error::ConfigError;

/// Hosted assistant (OpenAI Assistants API) configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    /// Display name used when the assistant is created at startup.
    pub name: String,
    /// Reuse an existing assistant instead of creating a new one.
    pub assistant_id: Option<String>,
    /// Retries for transient HTTP failures (429, 5xx).
    pub max_retries: u32,
}

impl AssistantConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: SecretString::from(required_env(
                "OPENAI_API_KEY",
                "Set it to an OpenAI API key with Assistants access.",
            )?),
            base_url: parse_string_env("OPENAI_BASE_URL", "https://api.openai.com/v1")?
                .trim_end_matches('/')
                .to_string(),
            model: parse_string_env("OPENAI_MODEL", "gpt-4o")?,
            name: parse_string_env("ASSISTANT_NAME", "AIAgent")?,
            assistant_id: optional_env("ASSISTANT_ID")?,
            max_retries: parse_optional_env("OPENAI_MAX_RETRIES", 3)?,
        })
    }
}
