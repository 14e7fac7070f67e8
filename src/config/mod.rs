//! Configuration for vaultclaw.
//!
//! Everything is read from environment variables. A `.env` file in the
//! working directory is loaded first via dotenvy, which never overwrites
//! variables that are already set.

mod agent;
mod assistant;
mod chain;
mod channels;
pub(crate) mod helpers;

pub use agent::AgentConfig;
pub use assistant::AssistantConfig;
pub use chain::{
    ChainConfig, ContractAddresses, DEFAULT_UNISWAP_V2_FACTORY, DEFAULT_VAULT_ADDRESS,
    DEFAULT_YBTC_ADDRESS, DEFAULT_YU_ADDRESS,
};
pub use channels::{ChannelsConfig, CliConfig, DiscordConfig, HttpConfig};

use crate::error::ConfigError;

/// Main configuration for the agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub chain: ChainConfig,
    pub agent: AgentConfig,
    pub channels: ChannelsConfig,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::build()
    }

    fn build() -> Result<Self, ConfigError> {
        Ok(Self {
            assistant: AssistantConfig::resolve()?,
            chain: ChainConfig::resolve()?,
            agent: AgentConfig::resolve()?,
            channels: ChannelsConfig::resolve()?,
        })
    }
}
