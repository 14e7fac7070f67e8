//! JSON-RPC transport for EVM nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::{TxReceipt, normalize_tx_hash, parse_hex_bytes};
use crate::error::ChainError;

/// Thin client over the `eth_*` namespace.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    status: Option<String>,
    block_number: Option<String>,
    gas_used: Option<String>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChainError::Rpc {
                method: "client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let raw = self.call_str("eth_chainId", json!([])).await?;
        parse_hex_u64(&raw, "eth_chainId")
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        let raw = self
            .call_str("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_hex_u256(&raw, "eth_getBalance")
    }

    pub async fn eth_call(&self, to: Address, data: &Bytes) -> Result<Bytes, ChainError> {
        let raw = self
            .call_str("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        parse_hex_bytes(Some(&raw), "eth_call result")
    }

    pub async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        let raw = self
            .call_str("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_hex_u64(&raw, "eth_getTransactionCount")
    }

    pub async fn gas_price(&self) -> Result<U256, ChainError> {
        let raw = self.call_str("eth_gasPrice", json!([])).await?;
        parse_hex_u256(&raw, "eth_gasPrice")
    }

    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: &Bytes,
    ) -> Result<u64, ChainError> {
        let raw = self
            .call_str(
                "eth_estimateGas",
                json!([{ "from": from, "to": to, "value": value, "data": data }]),
            )
            .await?;
        parse_hex_u64(&raw, "eth_estimateGas")
    }

    pub async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, ChainError> {
        let encoded = format!("0x{}", hex::encode(raw_tx));
        let hash = self
            .call_str("eth_sendRawTransaction", json!([encoded]))
            .await?;
        normalize_tx_hash(&hash)
    }

    pub async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(result).map_err(|e| ChainError::Rpc {
            method: "eth_getTransactionReceipt".to_string(),
            reason: format!("malformed receipt: {e}"),
        })?;

        let status = raw.status.as_deref().unwrap_or("0x0");
        Ok(Some(TxReceipt {
            transaction_hash: raw.transaction_hash,
            success: parse_hex_u64(status, "receipt status")? == 1,
            block_number: raw
                .block_number
                .as_deref()
                .map(|b| parse_hex_u64(b, "receipt blockNumber"))
                .transpose()?
                .unwrap_or_default(),
            gas_used: raw
                .gas_used
                .as_deref()
                .map(|g| parse_hex_u256(g, "receipt gasUsed"))
                .transpose()?
                .unwrap_or_default(),
        }))
    }

    async fn call_str(&self, method: &str, params: Value) -> Result<String, ChainError> {
        match self.request(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(ChainError::Rpc {
                method: method.to_string(),
                reason: format!("expected string result, got {other}"),
            }),
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        tracing::debug!(method, id, "Sending JSON-RPC request");

        let rpc_err = |reason: String| ChainError::Rpc {
            method: method.to_string(),
            reason,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| rpc_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(rpc_err(format!("HTTP {status}: {text}")));
        }
        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| rpc_err(format!("invalid response body: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ChainError::RpcRejected {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

fn strip_hex_prefix<'a>(raw: &'a str, field: &str) -> Result<&'a str, ChainError> {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ChainError::InvalidValue {
            field: field.to_string(),
            reason: "must be 0x-prefixed hex".to_string(),
        })
}

pub(crate) fn parse_hex_u64(raw: &str, field: &str) -> Result<u64, ChainError> {
    let digits = strip_hex_prefix(raw, field)?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| ChainError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_hex_u256(raw: &str, field: &str) -> Result<U256, ChainError> {
    let digits = strip_hex_prefix(raw, field)?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    if digits.len() > 64 {
        return Err(ChainError::InvalidValue {
            field: field.to_string(),
            reason: "exceeds 32 bytes".to_string(),
        });
    }
    U256::from_str_radix(digits, 16).map_err(|e| ChainError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_quantities() {
        assert_eq!(parse_hex_u64("0x0", "n").unwrap(), 0);
        assert_eq!(parse_hex_u64("0xaa36a7", "n").unwrap(), 11_155_111);
        assert_eq!(parse_hex_u64("0x", "n").unwrap(), 0);
        assert!(parse_hex_u64("aa36a7", "n").is_err());

        assert_eq!(
            parse_hex_u256("0x4563918244f40000", "balance").unwrap(),
            U256::from(5_000_000_000_000_000_000u128)
        );
        assert!(parse_hex_u256(&format!("0x{}", "f".repeat(65)), "balance").is_err());
    }
}
