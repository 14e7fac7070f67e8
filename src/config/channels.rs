use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_bool_env, parse_optional_env};
use crate::error::ConfigError;

/// Channel configurations.
#[derive(Debug, Clone)]
pub struct ChannelsConfig {
    pub cli: CliConfig,
    pub http: Option<HttpConfig>,
    pub discord: Option<DiscordConfig>,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub webhook_secret: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub api_base: String,
    pub gateway_url: String,
}

impl ChannelsConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let http = if optional_env("HTTP_PORT")?.is_some() {
            Some(HttpConfig {
                host: optional_env("HTTP_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_optional_env("HTTP_PORT", 8080)?,
                webhook_secret: optional_env("HTTP_WEBHOOK_SECRET")?.map(SecretString::from),
            })
        } else {
            None
        };

        let discord = optional_env("DISCORD_BOT_TOKEN")?.map(|token| DiscordConfig {
            bot_token: SecretString::from(token),
            api_base: "https://discord.com/api/v10".to_string(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
        });

        Ok(Self {
            cli: CliConfig {
                enabled: parse_bool_env("CLI_ENABLED", true)?,
            },
            http,
            discord,
        })
    }

    /// Whether at least one channel will accept messages.
    pub fn any_enabled(&self) -> bool {
        self.cli.enabled || self.http.is_some() || self.discord.is_some()
    }
}
