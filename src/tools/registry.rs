//! Name-keyed table of the tools exposed to the assistant.

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::llm::ToolDefinition;
use crate::tools::tool::ChainTool;

/// Registry of available tools. Filled at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ChainTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in chain tool.
    pub fn with_chain_tools(uniswap_v2_factory: Address) -> Self {
        let mut registry = Self::new();
        for tool in [
            ChainTool::ExecuteVaultSwap,
            ChainTool::GetWalletAddress,
            ChainTool::GetBalance,
            ChainTool::GetTokenBalance,
            ChainTool::SendTransaction,
            ChainTool::TransferToken,
            ChainTool::ApproveTokenAllowance,
            ChainTool::CreateUniswapV2Pair {
                factory: uniswap_v2_factory,
            },
            ChainTool::GetTransactionReceipt,
            ChainTool::WriteContract,
            ChainTool::ReadContract,
        ] {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: ChainTool) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool {} registered twice, keeping the latest", name);
        }
        tracing::debug!("Registered tool: {}", name);
    }

    pub fn get(&self, name: &str) -> Option<&ChainTool> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Tool definitions for the assistant, sorted by name.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(ChainTool::definition).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_tools_registered() {
        let registry = ToolRegistry::with_chain_tools(Address::ZERO);
        assert_eq!(registry.count(), 11);
        assert!(registry.has("execute_vault_swap"));
        assert!(registry.has("create_uniswap_v2_pair"));
        assert_eq!(registry.get("write_contract"), Some(&ChainTool::WriteContract));
        assert_eq!(registry.get("read_contract"), Some(&ChainTool::ReadContract));
        assert!(registry.get("deploy_erc20").is_none());
    }

    #[test]
    fn test_definitions_sorted_and_complete() {
        let registry = ToolRegistry::with_chain_tools(Address::ZERO);
        let definitions = registry.tool_definitions();
        let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names, registry.list());

        let swap = definitions
            .iter()
            .find(|d| d.name == "execute_vault_swap")
            .unwrap();
        assert_eq!(swap.parameters["required"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(ChainTool::CreateUniswapV2Pair {
            factory: Address::ZERO,
        });
        registry.register(ChainTool::CreateUniswapV2Pair {
            factory: Address::repeat_byte(1),
        });
        assert_eq!(registry.count(), 1);
        assert_eq!(
            registry.get("create_uniswap_v2_pair"),
            Some(&ChainTool::CreateUniswapV2Pair {
                factory: Address::repeat_byte(1)
            })
        );
    }
}
