//! Tool types and the closed set of chain tools.

use alloy_primitives::Address;
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::chain::ChainClient;
use crate::error::ChainError;
use crate::llm::ToolDefinition;
use crate::tools::builtin::{contract, pair, receipt, swap, token, wallet};

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Every capability the assistant can invoke.
///
/// Variants that need deployment-specific data carry it, so a tool is fully
/// described once it is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainTool {
    ExecuteVaultSwap,
    GetWalletAddress,
    GetBalance,
    GetTokenBalance,
    SendTransaction,
    TransferToken,
    ApproveTokenAllowance,
    CreateUniswapV2Pair { factory: Address },
    GetTransactionReceipt,
    WriteContract,
    ReadContract,
}

impl ChainTool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExecuteVaultSwap => swap::NAME,
            Self::GetWalletAddress => wallet::ADDRESS_NAME,
            Self::GetBalance => wallet::BALANCE_NAME,
            Self::SendTransaction => wallet::SEND_NAME,
            Self::GetTokenBalance => token::BALANCE_NAME,
            Self::TransferToken => token::TRANSFER_NAME,
            Self::ApproveTokenAllowance => token::APPROVE_NAME,
            Self::CreateUniswapV2Pair { .. } => pair::NAME,
            Self::GetTransactionReceipt => receipt::NAME,
            Self::WriteContract => contract::WRITE_NAME,
            Self::ReadContract => contract::READ_NAME,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ExecuteVaultSwap => {
                "Call AIAgentVault.executeSwap to swap user's tokenIn -> tokenOut via Uniswap V2"
            }
            Self::GetWalletAddress => "Get the address of the agent's signing wallet",
            Self::GetBalance => "Get the native ETH balance of an address",
            Self::SendTransaction => {
                "Send a transaction from the agent wallet with optional ETH value and calldata"
            }
            Self::GetTokenBalance => "Get the ERC20 token balance of an account",
            Self::TransferToken => "Transfer ERC20 tokens from the agent wallet to an address",
            Self::ApproveTokenAllowance => {
                "Approve a spender to transfer ERC20 tokens from the agent wallet"
            }
            Self::CreateUniswapV2Pair { .. } => {
                "Create a Uniswap V2 liquidity pair for two tokens via the factory contract"
            }
            Self::GetTransactionReceipt => "Get the receipt of a transaction by its hash",
            Self::WriteContract => "Execute a state-changing (write) function on a smart contract",
            Self::ReadContract => "Call a read-only (view or pure) function on a smart contract",
        }
    }

    /// JSON Schema of the arguments, sent to the assistant at creation.
    pub fn parameters_schema(&self) -> Value {
        match self {
            Self::ExecuteVaultSwap => swap::schema(),
            Self::GetWalletAddress => wallet::address_schema(),
            Self::GetBalance => wallet::balance_schema(),
            Self::SendTransaction => wallet::send_schema(),
            Self::GetTokenBalance => token::balance_schema(),
            Self::TransferToken => token::transfer_schema(),
            Self::ApproveTokenAllowance => token::approve_schema(),
            Self::CreateUniswapV2Pair { .. } => pair::schema(),
            Self::GetTransactionReceipt => receipt::schema(),
            Self::WriteContract => contract::write_schema(),
            Self::ReadContract => contract::read_schema(),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }

    /// Decode `params` into the tool's typed arguments and run it.
    pub async fn invoke(&self, params: Value, chain: &dyn ChainClient) -> Result<String, ToolError> {
        match self {
            Self::ExecuteVaultSwap => swap::execute(parse_args(params)?, chain).await,
            Self::GetWalletAddress => Ok(wallet::address(chain)),
            Self::GetBalance => wallet::balance(parse_args(params)?, chain).await,
            Self::SendTransaction => wallet::send(parse_args(params)?, chain).await,
            Self::GetTokenBalance => token::balance(parse_args(params)?, chain).await,
            Self::TransferToken => token::transfer(parse_args(params)?, chain).await,
            Self::ApproveTokenAllowance => token::approve(parse_args(params)?, chain).await,
            Self::CreateUniswapV2Pair { factory } => {
                pair::create(*factory, parse_args(params)?, chain).await
            }
            Self::GetTransactionReceipt => receipt::lookup(parse_args(params)?, chain).await,
            Self::WriteContract => contract::write(parse_args(params)?, chain).await,
            Self::ReadContract => contract::read(parse_args(params)?, chain).await,
        }
    }
}

/// Deserialize tool arguments, reporting serde's message as a parameter error.
pub fn parse_args<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// Accept a JSON string, number or null for a numeric field.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(number_literal(&n))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

/// Integral floats (`5.0`, `5e18`) become their exact integer digits; other
/// numbers keep their JSON form.
fn number_literal(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_u64() && !n.is_i64() && f.is_finite() && f.fract() == 0.0 => {
            format!("{f:.0}")
        }
        _ => n.to_string(),
    }
}

/// JSON Schema fragment for an address-typed string.
pub(crate) fn address_property(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "pattern": "^0x[a-fA-F0-9]{40}$",
        "description": description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tools() -> Vec<ChainTool> {
        vec![
            ChainTool::ExecuteVaultSwap,
            ChainTool::GetWalletAddress,
            ChainTool::GetBalance,
            ChainTool::GetTokenBalance,
            ChainTool::SendTransaction,
            ChainTool::TransferToken,
            ChainTool::ApproveTokenAllowance,
            ChainTool::CreateUniswapV2Pair {
                factory: Address::ZERO,
            },
            ChainTool::GetTransactionReceipt,
            ChainTool::WriteContract,
            ChainTool::ReadContract,
        ]
    }

    #[test]
    fn test_every_schema_is_an_object_with_required() {
        for tool in all_tools() {
            let schema = tool.parameters_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(schema["required"].is_array(), "{}", tool.name());
            for key in schema["required"].as_array().unwrap() {
                let key = key.as_str().unwrap();
                assert!(
                    schema["properties"].get(key).is_some(),
                    "{} requires undeclared {key}",
                    tool.name()
                );
            }
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = all_tools().iter().map(|t| t.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all_tools().len());
    }

    #[test]
    fn test_parse_args_reports_missing_field() {
        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Args {
            address: String,
        }
        let err = parse_args::<Args>(serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("address"));
    }
}
