//! vaultclaw - Main entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vaultclaw::{
    agent::{Agent, AddressBook, CommandRouter, RunPipeline, RunPoller, ToolDispatcher},
    chain::{ChainClient, RpcWallet, display_address, parse_address},
    channels::{ChannelManager, DiscordChannel, HttpChannel, ReplChannel},
    config::{Config, DEFAULT_UNISWAP_V2_FACTORY},
    llm::{AssistantSpec, create_assistant_service, ensure_assistant},
    tools::ToolRegistry,
};

#[derive(Debug, Parser)]
#[command(name = "vaultclaw", version, about = "Chat-driven vault swaps and ERC20 operations")]
struct Cli {
    /// Only run the interactive REPL, even if HTTP or Discord are configured.
    #[arg(long)]
    cli_only: bool,

    /// Print the tool schemas sent to the assistant and exit.
    #[arg(long)]
    print_tools: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vaultclaw=info")),
        )
        .init();

    if cli.print_tools {
        let factory = parse_address(DEFAULT_UNISWAP_V2_FACTORY, "factory")?;
        let tools: Vec<_> = ToolRegistry::with_chain_tools(factory)
            .tool_definitions()
            .iter()
            .map(|t| t.to_function_json())
            .collect();
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    let config = Config::from_env()?;

    let wallet = RpcWallet::from_config(&config.chain)?;
    if let Err(e) = wallet.check_chain_id().await {
        tracing::warn!("Chain id check failed: {}", e);
    }
    tracing::info!(
        address = %display_address(&wallet.address()),
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        "Signer ready"
    );
    let chain: Arc<dyn ChainClient> = Arc::new(wallet);

    let factory = parse_address(&config.chain.contracts.uniswap_v2_factory, "UNISWAP_V2_FACTORY")?;
    let registry = Arc::new(ToolRegistry::with_chain_tools(factory));
    tracing::info!("Registered {} tools", registry.count());

    let service = create_assistant_service(&config.assistant)?;
    let spec = AssistantSpec {
        name: config.assistant.name.clone(),
        model: config.assistant.model.clone(),
        instructions: vaultclaw::agent::assistant_instructions(&config.chain.contracts),
        tools: registry.tool_definitions(),
    };
    let assistant_id = ensure_assistant(service.as_ref(), &config.assistant, &spec).await?;

    let poller = RunPoller::from_config(Arc::clone(&service), &config.agent);
    let dispatcher = ToolDispatcher::new(
        Arc::clone(&service),
        registry,
        chain,
        poller.clone(),
        config.agent.max_tool_rounds,
    );
    let pipeline = RunPipeline::new(service, assistant_id, poller, dispatcher);
    let router = CommandRouter::new(
        config.agent.command_prefix.clone(),
        AddressBook::new(),
        Arc::new(pipeline),
    );

    let mut channels = ChannelManager::new();
    if config.channels.cli.enabled || cli.cli_only {
        channels.add(Box::new(ReplChannel::new(config.agent.command_prefix.clone())));
    }
    if !cli.cli_only {
        if let Some(http) = config.channels.http.clone() {
            channels.add(Box::new(HttpChannel::new(
                http,
                config.agent.command_prefix.clone(),
            )));
        }
        if let Some(discord) = config.channels.discord.clone() {
            channels.add(Box::new(DiscordChannel::new(discord)));
        }
    }
    if channels.is_empty() {
        anyhow::bail!(
            "No channel enabled. Set CLI_ENABLED=true, HTTP_PORT or DISCORD_BOT_TOKEN."
        );
    }

    Agent::new(config.agent.name.clone(), router, channels)
        .run()
        .await?;

    Ok(())
}
