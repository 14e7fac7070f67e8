use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::ChainClient;
use crate::tools::ToolError;

pub(crate) const NAME: &str = "get_transaction_receipt";

pub(crate) fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "hash": {
                "type": "string",
                "pattern": "^0x[a-fA-F0-9]{64}$",
                "description": "The transaction hash"
            }
        },
        "required": ["hash"]
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptArgs {
    hash: String,
}

pub(crate) async fn lookup(args: ReceiptArgs, chain: &dyn ChainClient) -> Result<String, ToolError> {
    match chain.transaction_receipt(&args.hash).await? {
        Some(receipt) => Ok(format!(
            "Transaction {}: status {}, block {}, gas used {}",
            receipt.transaction_hash,
            if receipt.success { "success" } else { "reverted" },
            receipt.block_number,
            receipt.gas_used
        )),
        None => Ok(format!(
            "Transaction {} is pending or unknown",
            args.hash.trim()
        )),
    }
}
