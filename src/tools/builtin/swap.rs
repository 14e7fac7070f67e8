//! Vault swap execution.

use serde_json::{Value, json};

use crate::chain::abi::{self, Word};
use crate::chain::{ChainClient, TxRequest, parse_address};
use crate::tools::ToolError;
use crate::tools::sanitize::{RawSwapArgs, sanitize_swap};
use crate::tools::tool::address_property;

pub(crate) const NAME: &str = "execute_vault_swap";

pub(crate) fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "vaultAddress": address_property("Address of the deployed AIAgentVault"),
            "user": address_property("Vault user whose funds are swapped"),
            "tokenIn": address_property("Token sold"),
            "tokenOut": address_property("Token bought"),
            "amountIn": {
                "type": "string",
                "description": "Amount of tokens to swap, possibly non-wei (will scale up)."
            },
            "minAmountOut": {
                "type": "string",
                "description": "Minimum tokens out, also possibly non-wei (will scale)."
            },
            "deadline": {
                "type": "string",
                "description": "Deadline (UNIX timestamp). If too low, now+15min is used."
            }
        },
        "required": ["vaultAddress", "user", "tokenIn", "tokenOut", "amountIn", "minAmountOut", "deadline"]
    })
}

/// Sanitize, encode and submit `executeSwap`.
///
/// Argument problems are errors. A failed submission is reported as a normal
/// output so the assistant can explain it to the user.
pub(crate) async fn execute(args: RawSwapArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let swap = sanitize_swap(args)?;
    let vault = parse_address(&swap.vault, "vaultAddress")?;
    let calldata = abi::encode_call(
        abi::EXECUTE_SWAP,
        &[
            Word::Address(parse_address(&swap.user, "user")?),
            Word::Address(parse_address(&swap.token_in, "tokenIn")?),
            Word::Address(parse_address(&swap.token_out, "tokenOut")?),
            Word::Uint(swap.amount_in),
            Word::Uint(swap.min_amount_out),
            Word::Uint(swap.deadline),
        ],
    );

    tracing::info!(
        vault = %swap.vault,
        user = %swap.user,
        amount_in = %swap.amount_in,
        min_amount_out = %swap.min_amount_out,
        deadline = %swap.deadline,
        "Executing vault swap"
    );

    match chain.send_transaction(TxRequest::call(vault, calldata)).await {
        Ok(hash) => Ok(format!("Swap executed successfully. Tx hash: {hash}")),
        Err(e) => {
            tracing::warn!(error = %e, "Vault swap submission failed");
            Ok(format!("Swap failed with error: {e}"))
        }
    }
}
