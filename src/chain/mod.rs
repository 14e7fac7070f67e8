//! Blockchain access.
//!
//! Tools talk to the chain through the [`ChainClient`] trait. The production
//! implementation is [`RpcWallet`], which signs EIP-1559 transactions locally
//! with the configured key and submits them over JSON-RPC.

pub mod abi;
pub mod rpc;
pub mod units;
pub mod wallet;

use std::str::FromStr;

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use crate::error::ChainError;

pub use rpc::RpcClient;
pub use wallet::RpcWallet;

/// A transaction the signer should build, sign and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl TxRequest {
    /// A contract call carrying no native value.
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data,
        }
    }
}

/// The subset of a transaction receipt surfaced to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub success: bool,
    pub block_number: u64,
    pub gas_used: U256,
}

/// Read and write access to an EVM chain on behalf of one signing account.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the signing account.
    fn address(&self) -> Address;

    /// Native balance in wei.
    async fn balance(&self, account: Address) -> Result<U256, ChainError>;

    /// Execute a read-only call and return the raw return data.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Sign and broadcast a transaction, returning its 0x-prefixed hash.
    async fn send_transaction(&self, tx: TxRequest) -> Result<String, ChainError>;

    /// Receipt of a mined transaction, `None` while it is still pending.
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>, ChainError>;
}

/// Whether `raw` is a `0x`-prefixed 20-byte hex address.
pub fn is_address(raw: &str) -> bool {
    raw.len() == 42
        && raw.starts_with("0x")
        && raw.as_bytes()[2..].iter().all(|b| b.is_ascii_hexdigit())
}

/// Decode an address argument, naming `field` in the error.
pub fn parse_address(raw: &str, field: &str) -> Result<Address, ChainError> {
    let trimmed = raw.trim();
    if !is_address(trimmed) {
        return Err(ChainError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{trimmed}' must be a 0x-prefixed 20-byte hex string"),
        });
    }
    Address::from_str(trimmed).map_err(|e| ChainError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Checksummed rendering used in every user-facing message.
pub fn display_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// Validate a 32-byte transaction hash and lowercase it.
pub fn normalize_tx_hash(raw: &str) -> Result<String, ChainError> {
    let trimmed = raw.trim().to_ascii_lowercase();
    let valid = trimmed.len() == 66
        && trimmed.starts_with("0x")
        && trimmed.as_bytes()[2..].iter().all(|b| b.is_ascii_hexdigit());
    if !valid {
        return Err(ChainError::InvalidValue {
            field: "hash".to_string(),
            reason: "transaction hash must be 0x followed by 64 hex chars".to_string(),
        });
    }
    Ok(trimmed)
}

/// Decode optional 0x-prefixed calldata. An empty or absent value is no data.
pub fn parse_hex_bytes(raw: Option<&str>, field: &str) -> Result<Bytes, ChainError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Bytes::new());
    };
    let without_prefix = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| ChainError::InvalidValue {
            field: field.to_string(),
            reason: "must be 0x-prefixed hex".to_string(),
        })?;
    let bytes = hex::decode(without_prefix).map_err(|e| ChainError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Bytes::from(bytes))
}
