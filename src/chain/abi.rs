//! Minimal Solidity ABI encoding for the handful of static-argument
//! functions the tools call.

use alloy_primitives::{Address, Bytes, U256, keccak256};

use crate::error::ChainError;

pub const EXECUTE_SWAP: &str = "executeSwap(address,address,address,uint256,uint256,uint256)";
pub const ERC20_BALANCE_OF: &str = "balanceOf(address)";
pub const ERC20_TRANSFER: &str = "transfer(address,uint256)";
pub const ERC20_APPROVE: &str = "approve(address,uint256)";
pub const UNISWAP_V2_CREATE_PAIR: &str = "createPair(address,address)";

/// A single static ABI word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    Address(Address),
    Uint(U256),
}

impl Word {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Word::Address(address) => {
                out.extend_from_slice(&[0u8; 12]);
                out.extend_from_slice(address.as_slice());
            }
            Word::Uint(value) => out.extend_from_slice(&value.to_be_bytes::<32>()),
        }
    }
}

/// First four bytes of the keccak256 of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector followed by the head-encoded arguments.
pub fn encode_call(signature: &str, args: &[Word]) -> Bytes {
    let mut out = Vec::with_capacity(4 + 32 * args.len());
    out.extend_from_slice(&selector(signature));
    for arg in args {
        arg.write(&mut out);
    }
    Bytes::from(out)
}

/// Decode the first return word as a `uint256`.
pub fn decode_uint(data: &[u8]) -> Result<U256, ChainError> {
    if data.len() < 32 {
        return Err(ChainError::InvalidValue {
            field: "return data".to_string(),
            reason: format!("expected at least 32 bytes, got {}", data.len()),
        });
    }
    Ok(U256::from_be_slice(&data[..32]))
}
