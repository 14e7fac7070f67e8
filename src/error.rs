//! Error types for vaultclaw.

use std::time::Duration;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Assistant service errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Blockchain client errors.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC {method} failed: {reason}")]
    Rpc { method: String, reason: String },

    #[error("RPC {method} returned error {code}: {message}")]
    RpcRejected {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Insufficient balance: have {balance} wei, need {required} wei")]
    InsufficientBalance { balance: String, required: String },
}

/// Run lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Run {run_id} still {status} after {attempts} polls ({waited:?})")]
    PollTimeout {
        run_id: String,
        status: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Run {run_id} still requires action after {rounds} tool rounds")]
    TooManyToolRounds { run_id: String, rounds: usize },
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
