//! Local-key wallet: EIP-1559 transaction assembly and signing.

use alloy_primitives::{Address, Bytes, U256, keccak256};
use alloy_rlp::{BufMut, Encodable, Header, length_of_length};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use secrecy::{ExposeSecret, SecretString};

use crate::chain::{ChainClient, RpcClient, TxReceipt, TxRequest, normalize_tx_hash};
use crate::config::ChainConfig;
use crate::error::ChainError;

const EIP1559_TX_TYPE: u8 = 0x02;
const EMPTY_ACCESS_LIST_RLP_LEN: usize = 1;
const TRANSFER_GAS: u64 = 21_000;
const FALLBACK_GAS_LIMIT: u64 = 300_000;
const PRIORITY_FEE_WEI: u64 = 1_000_000_000;

/// Wallet backed by a private key held in memory and a JSON-RPC endpoint.
pub struct RpcWallet {
    rpc: RpcClient,
    signing_key: SigningKey,
    address: Address,
    chain_id: u64,
}

impl RpcWallet {
    pub fn new(rpc: RpcClient, private_key: &SecretString, chain_id: u64) -> Result<Self, ChainError> {
        let signing_key = parse_signing_key(private_key)?;
        let address = address_of(&signing_key);
        Ok(Self {
            rpc,
            signing_key,
            address,
            chain_id,
        })
    }

    pub fn from_config(config: &ChainConfig) -> Result<Self, ChainError> {
        let rpc = RpcClient::new(config.rpc_url.clone())?;
        Self::new(rpc, &config.private_key, config.chain_id)
    }

    /// Compare the configured chain id with the node's, logging a mismatch.
    pub async fn check_chain_id(&self) -> Result<(), ChainError> {
        let remote = self.rpc.chain_id().await?;
        if remote != self.chain_id {
            tracing::warn!(
                configured = self.chain_id,
                remote,
                rpc = self.rpc.url(),
                "Configured chain id does not match the RPC node"
            );
        }
        Ok(())
    }

    fn sign(&self, tx: &Eip1559Tx) -> Result<Vec<u8>, ChainError> {
        let unsigned = tx.encode_unsigned();
        let hash = keccak256(&unsigned);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let bytes = signature.to_bytes();
        Ok(tx.encode_signed(
            u8::from(recovery_id.is_y_odd()),
            U256::from_be_slice(&bytes[..32]),
            U256::from_be_slice(&bytes[32..]),
        ))
    }
}

#[async_trait]
impl ChainClient for RpcWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        self.rpc.get_balance(account).await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.rpc.eth_call(to, &data).await
    }

    async fn send_transaction(&self, request: TxRequest) -> Result<String, ChainError> {
        if !request.value.is_zero() {
            let balance = self.rpc.get_balance(self.address).await?;
            if balance < request.value {
                return Err(ChainError::InsufficientBalance {
                    balance: balance.to_string(),
                    required: request.value.to_string(),
                });
            }
        }

        let nonce = self.rpc.get_transaction_count(self.address).await?;
        let gas_limit = if request.data.is_empty() {
            TRANSFER_GAS
        } else {
            match self
                .rpc
                .estimate_gas(self.address, request.to, request.value, &request.data)
                .await
            {
                Ok(estimate) => estimate.saturating_mul(12) / 10,
                // A reverting estimate is reported by the node itself, not guessed around.
                Err(e @ ChainError::RpcRejected { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Gas estimation failed, using fallback limit");
                    FALLBACK_GAS_LIMIT
                }
            }
        };
        let base_fee = self.rpc.gas_price().await?;
        let priority_fee = U256::from(PRIORITY_FEE_WEI);

        let tx = Eip1559Tx {
            chain_id: U256::from(self.chain_id),
            nonce: U256::from(nonce),
            max_priority_fee_per_gas: priority_fee,
            max_fee_per_gas: base_fee + priority_fee,
            gas_limit: U256::from(gas_limit),
            to: request.to,
            value: request.value,
            data: request.data,
        };
        let raw = self.sign(&tx)?;
        let hash = self.rpc.send_raw_transaction(&raw).await?;
        tracing::info!(%hash, to = %request.to, nonce, "Transaction broadcast");
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        let hash = normalize_tx_hash(hash)?;
        self.rpc.get_transaction_receipt(&hash).await
    }
}

fn parse_signing_key(private_key: &SecretString) -> Result<SigningKey, ChainError> {
    let raw = private_key.expose_secret().trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(raw)
        .map_err(|e| ChainError::Signing(format!("private key is not valid hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(ChainError::Signing(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| ChainError::Signing(format!("invalid private key: {e}")))
}

/// Ethereum address of a secp256k1 key: last 20 bytes of keccak256(pubkey).
fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[derive(Debug, Clone)]
struct Eip1559Tx {
    chain_id: U256,
    nonce: U256,
    max_priority_fee_per_gas: U256,
    max_fee_per_gas: U256,
    gas_limit: U256,
    to: Address,
    value: U256,
    data: Bytes,
}

impl Eip1559Tx {
    fn fields_length(&self) -> usize {
        self.chain_id.length()
            + self.nonce.length()
            + self.max_priority_fee_per_gas.length()
            + self.max_fee_per_gas.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.data.length()
            + EMPTY_ACCESS_LIST_RLP_LEN
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.max_priority_fee_per_gas.encode(out);
        self.max_fee_per_gas.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.data.encode(out);
        Header {
            list: true,
            payload_length: 0,
        }
        .encode(out);
    }

    /// `0x02 || rlp([fields..])`, the preimage of the signing hash.
    fn encode_unsigned(&self) -> Vec<u8> {
        typed(&alloy_rlp::encode(self))
    }

    fn encode_signed(&self, y_parity: u8, r: U256, s: U256) -> Vec<u8> {
        typed(&alloy_rlp::encode(SignedEip1559Tx {
            tx: self,
            y_parity,
            r,
            s,
        }))
    }
}

impl Encodable for Eip1559Tx {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.fields_length(),
        }
        .encode(out);
        self.encode_fields(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.fields_length();
        payload_length + length_of_length(payload_length)
    }
}

struct SignedEip1559Tx<'a> {
    tx: &'a Eip1559Tx,
    y_parity: u8,
    r: U256,
    s: U256,
}

impl SignedEip1559Tx<'_> {
    fn payload_length(&self) -> usize {
        self.tx.fields_length() + self.y_parity.length() + self.r.length() + self.s.length()
    }
}

impl Encodable for SignedEip1559Tx<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.tx.encode_fields(out);
        self.y_parity.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}

fn typed(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(EIP1559_TX_TYPE);
    out.extend_from_slice(payload);
    out
}
