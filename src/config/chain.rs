use secrecy::SecretString;

use crate::config::helpers::{parse_address_env, parse_optional_env, parse_string_env, required_env};
use crate::error::ConfigError;

pub const DEFAULT_VAULT_ADDRESS: &str = "0xdfA8A83B0941F1d3ec47AD3BfEAE9D929E29b915";
pub const DEFAULT_YBTC_ADDRESS: &str = "0xBBd3EDd4D3b519c0d14965d9311185CFaC8c3220";
pub const DEFAULT_YU_ADDRESS: &str = "0xcB856bC5Aa2664E47c9caDce6fF65117c5201a1C";
pub const DEFAULT_UNISWAP_V2_FACTORY: &str = "0xF62c03E08ada871A0bEb309762E260a7a6a880E6";

/// Blockchain connection and contract configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Hex-encoded secp256k1 key used to sign every transaction.
    pub private_key: SecretString,
    pub contracts: ContractAddresses,
}

/// Well-known contract addresses advertised to the planner.
#[derive(Debug, Clone)]
pub struct ContractAddresses {
    pub vault: String,
    pub ybtc: String,
    pub yu: String,
    pub uniswap_v2_factory: String,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            vault: DEFAULT_VAULT_ADDRESS.to_string(),
            ybtc: DEFAULT_YBTC_ADDRESS.to_string(),
            yu: DEFAULT_YU_ADDRESS.to_string(),
            uniswap_v2_factory: DEFAULT_UNISWAP_V2_FACTORY.to_string(),
        }
    }
}

impl ChainConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_url: parse_string_env("RPC_URL", "https://ethereum-sepolia-rpc.publicnode.com")?,
            chain_id: parse_optional_env("CHAIN_ID", 11_155_111)?,
            private_key: SecretString::from(required_env(
                "PRIVATE_KEY",
                "Set it to the hex private key of the signing wallet.",
            )?),
            contracts: ContractAddresses::resolve()?,
        })
    }
}

impl ContractAddresses {
    fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            vault: parse_address_env("VAULT_ADDRESS", DEFAULT_VAULT_ADDRESS)?,
            ybtc: parse_address_env("YBTC_ADDRESS", DEFAULT_YBTC_ADDRESS)?,
            yu: parse_address_env("YU_ADDRESS", DEFAULT_YU_ADDRESS)?,
            uniswap_v2_factory: parse_address_env(
                "UNISWAP_V2_FACTORY",
                DEFAULT_UNISWAP_V2_FACTORY,
            )?,
        })
    }
}
