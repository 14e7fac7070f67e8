use alloy_primitives::Address;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::abi::{self, Word};
use crate::chain::{ChainClient, TxRequest, display_address, parse_address};
use crate::tools::ToolError;
use crate::tools::tool::address_property;

pub(crate) const NAME: &str = "create_uniswap_v2_pair";

pub(crate) fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tokenA": address_property("First token of the pair"),
            "tokenB": address_property("Second token of the pair")
        },
        "required": ["tokenA", "tokenB"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PairArgs {
    token_a: String,
    token_b: String,
}

pub(crate) async fn create(
    factory: Address,
    args: PairArgs,
    chain: &dyn ChainClient,
) -> Result<String, ToolError> {
    let token_a = parse_address(&args.token_a, "tokenA")?;
    let token_b = parse_address(&args.token_b, "tokenB")?;
    if token_a == token_b {
        return Err(ToolError::InvalidParameters(
            "tokenA and tokenB must be different".to_string(),
        ));
    }

    let data = abi::encode_call(
        abi::UNISWAP_V2_CREATE_PAIR,
        &[Word::Address(token_a), Word::Address(token_b)],
    );
    let hash = chain.send_transaction(TxRequest::call(factory, data)).await?;
    Ok(format!(
        "Tx submitted to createPair({}, {}). Hash: {hash}",
        display_address(&token_a),
        display_address(&token_b)
    ))
}
