//! ERC20 balance, transfer and approval.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::abi::{self, Word};
use crate::chain::units::{DEFAULT_DECIMALS, format_units, parse_units};
use crate::chain::{ChainClient, TxRequest, display_address, parse_address};
use crate::tools::ToolError;
use crate::tools::tool::{address_property, lenient_string};

pub(crate) const BALANCE_NAME: &str = "get_token_balance";
pub(crate) const TRANSFER_NAME: &str = "transfer_token";
pub(crate) const APPROVE_NAME: &str = "approve_token_allowance";

pub(crate) fn balance_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tokenAddress": address_property("The ERC20 token contract"),
            "accountAddress": address_property("The account whose balance is read")
        },
        "required": ["tokenAddress", "accountAddress"]
    })
}

pub(crate) fn transfer_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tokenAddress": address_property("The ERC20 token contract"),
            "to": address_property("The recipient address"),
            "amount": {
                "type": "string",
                "description": "Amount in whole tokens (e.g. \"1.5\"), 18 decimals assumed"
            }
        },
        "required": ["tokenAddress", "to", "amount"]
    })
}

pub(crate) fn approve_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tokenAddress": address_property("The ERC20 token contract"),
            "spenderAddress": address_property("The address allowed to spend"),
            "amount": {
                "type": "string",
                "description": "Allowance in whole tokens (e.g. \"100\"), 18 decimals assumed"
            }
        },
        "required": ["tokenAddress", "spenderAddress", "amount"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BalanceArgs {
    token_address: String,
    account_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferArgs {
    token_address: String,
    to: String,
    #[serde(deserialize_with = "lenient_string")]
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApproveArgs {
    token_address: String,
    spender_address: String,
    #[serde(deserialize_with = "lenient_string")]
    amount: Option<String>,
}

pub(crate) async fn balance(args: BalanceArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let token = parse_address(&args.token_address, "tokenAddress")?;
    let account = parse_address(&args.account_address, "accountAddress")?;

    let data = abi::encode_call(abi::ERC20_BALANCE_OF, &[Word::Address(account)]);
    let raw = chain.call(token, data).await?;
    let amount = abi::decode_uint(&raw)?;

    Ok(format!(
        "Balance of {} for token {}: {}",
        display_address(&account),
        display_address(&token),
        format_units(amount, DEFAULT_DECIMALS)
    ))
}

pub(crate) async fn transfer(args: TransferArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let token = parse_address(&args.token_address, "tokenAddress")?;
    let to = parse_address(&args.to, "to")?;
    let amount = require_amount(args.amount.as_deref())?;

    let data = abi::encode_call(abi::ERC20_TRANSFER, &[Word::Address(to), Word::Uint(amount)]);
    let hash = chain.send_transaction(TxRequest::call(token, data)).await?;
    Ok(format!(
        "Transferred {} of token {} to {}. Tx hash: {hash}",
        format_units(amount, DEFAULT_DECIMALS),
        display_address(&token),
        display_address(&to)
    ))
}

pub(crate) async fn approve(args: ApproveArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    let token = parse_address(&args.token_address, "tokenAddress")?;
    let spender = parse_address(&args.spender_address, "spenderAddress")?;
    let amount = require_amount(args.amount.as_deref())?;

    let data = abi::encode_call(abi::ERC20_APPROVE, &[Word::Address(spender), Word::Uint(amount)]);
    let hash = chain.send_transaction(TxRequest::call(token, data)).await?;
    Ok(format!(
        "Approved {} to spend {} of token {}. Tx hash: {hash}",
        display_address(&spender),
        format_units(amount, DEFAULT_DECIMALS),
        display_address(&token)
    ))
}

fn require_amount(raw: Option<&str>) -> Result<alloy_primitives::U256, ToolError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidParameters("missing 'amount' parameter".to_string()))?;
    Ok(parse_units(raw, DEFAULT_DECIMALS, "amount")?)
}
