//! Agent wallet tools: address, native balance and raw transactions.

use alloy_primitives::U256;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::units::{DEFAULT_DECIMALS, format_units, parse_units};
use crate::chain::{ChainClient, TxRequest, display_address, parse_address, parse_hex_bytes};
use crate::tools::ToolError;
use crate::tools::tool::{address_property, lenient_string};

pub(crate) const ADDRESS_NAME: &str = "get_wallet_address";
pub(crate) const BALANCE_NAME: &str = "get_balance";
pub(crate) const SEND_NAME: &str = "send_transaction";

pub(crate) fn address_schema() -> Value {
    json!({ "type": "object", "properties": {}, "required": [] })
}

pub(crate) fn balance_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "address": address_property("The wallet address to get the balance of")
        },
        "required": ["address"]
    })
}

pub(crate) fn send_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "to": address_property("The recipient address"),
            "value": {
                "type": "string",
                "description": "Amount of ETH to send, in ETH (e.g. \"0.1\")"
            },
            "data": {
                "type": "string",
                "description": "Optional 0x-prefixed calldata"
            }
        },
        "required": ["to"]
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct BalanceArgs {
    address: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendArgs {
    to: String,
    #[serde(default, deserialize_with = "lenient_string")]
    value: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

pub(crate) fn address(chain: &dyn ChainClient) -> String {
    display_address(&chain.address())
}

pub(crate) async fn balance(args: BalanceArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let account = parse_address(&args.address, "address")?;
    let wei = chain.balance(account).await?;
    Ok(format!("{} ETH", format_units(wei, DEFAULT_DECIMALS)))
}

pub(crate) async fn send(args: SendArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let to = parse_address(&args.to, "to")?;
    let value = match args.value.as_deref().map(str::trim) {
        None | Some("") => U256::ZERO,
        Some(v) => parse_units(v, DEFAULT_DECIMALS, "value")?,
    };
    let data = parse_hex_bytes(args.data.as_deref(), "data")?;

    let hash = chain.send_transaction(TxRequest { to, value, data }).await?;
    Ok(format!("Transaction sent. Hash: {hash}"))
}
