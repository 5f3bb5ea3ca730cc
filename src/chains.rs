//! Chain and contract reference data
//!
//! Static chain tables (RPC endpoint, native currency, known tokens) plus the
//! deployed-contract lookup used to decide between the on-chain and the
//! simulated betting paths. An undeployed contract resolves to the all-zero
//! sentinel address.

use crate::config::GambaConfig;
use crate::errors::{ConfigurationError, GambaResult};
use alloy::primitives::{address, Address};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Address returned when no contract is deployed for a chain
pub const SENTINEL_ADDRESS: Address = Address::ZERO;

/// Contract name of the betting contract in the deployment table
pub const BETTING_CONTRACT: &str = "GambaBetting";

pub const USDC_CONTRACT: &str = "USDC";

/// Supported chains
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    #[default]
    Solana,
    Ethereum,
    Bnb,
}

impl ChainKind {
    pub const ALL: [ChainKind; 3] = [ChainKind::Solana, ChainKind::Ethereum, ChainKind::Bnb];

    /// Chains whose bets go through the EVM betting contract
    pub fn is_evm(&self) -> bool {
        matches!(self, ChainKind::Ethereum | ChainKind::Bnb)
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Solana => write!(f, "solana"),
            ChainKind::Ethereum => write!(f, "ethereum"),
            ChainKind::Bnb => write!(f, "bnb"),
        }
    }
}

impl FromStr for ChainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solana" | "sol" => Ok(ChainKind::Solana),
            "ethereum" | "eth" => Ok(ChainKind::Ethereum),
            "bnb" | "bsc" => Ok(ChainKind::Bnb),
            other => Err(format!("unknown chain '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    pub id: String,
    pub name: String,
    pub kind: ChainKind,
    pub rpc_endpoint: String,
    pub native_currency: NativeCurrency,
    pub block_explorer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// Token metadata; `address` is kept as text since Solana mints are base58
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenConfig {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_wager: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainTokens {
    pub chain: ChainKind,
    pub tokens: Vec<TokenConfig>,
}

fn native(name: &str, symbol: &str, decimals: u8) -> NativeCurrency {
    NativeCurrency {
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals,
    }
}

fn token(address: &str, name: &str, symbol: &str, decimals: u8, base_wager: f64) -> TokenConfig {
    TokenConfig {
        address: address.to_string(),
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals,
        base_wager: Some(base_wager),
    }
}

static CHAIN_CONFIGS: Lazy<HashMap<ChainKind, ChainConfig>> = Lazy::new(|| {
    let mut configs = HashMap::new();
    configs.insert(
        ChainKind::Solana,
        ChainConfig {
            id: "solana-mainnet".to_string(),
            name: "Solana".to_string(),
            kind: ChainKind::Solana,
            rpc_endpoint: "https://api.mainnet-beta.solana.com".to_string(),
            native_currency: native("Solana", "SOL", 9),
            block_explorer: "https://solscan.io".to_string(),
            chain_id: None,
        },
    );
    configs.insert(
        ChainKind::Ethereum,
        ChainConfig {
            id: "ethereum-mainnet".to_string(),
            name: "Ethereum".to_string(),
            kind: ChainKind::Ethereum,
            rpc_endpoint: "https://eth.llamarpc.com".to_string(),
            native_currency: native("Ether", "ETH", 18),
            block_explorer: "https://etherscan.io".to_string(),
            chain_id: Some(1),
        },
    );
    configs.insert(
        ChainKind::Bnb,
        ChainConfig {
            id: "bnb-mainnet".to_string(),
            name: "BNB Smart Chain".to_string(),
            kind: ChainKind::Bnb,
            rpc_endpoint: "https://bsc-dataseed1.binance.org".to_string(),
            native_currency: native("BNB", "BNB", 18),
            block_explorer: "https://bscscan.com".to_string(),
            chain_id: Some(56),
        },
    );
    configs
});

static CHAIN_TOKENS: Lazy<Vec<ChainTokens>> = Lazy::new(|| {
    vec![
        ChainTokens {
            chain: ChainKind::Solana,
            tokens: vec![
                token("So11111111111111111111111111111111111111112", "Solana", "SOL", 9, 0.01),
                token("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USD Coin", "USDC", 6, 1.0),
            ],
        },
        ChainTokens {
            chain: ChainKind::Ethereum,
            tokens: vec![
                token("0x0000000000000000000000000000000000000000", "Ether", "ETH", 18, 0.001),
                token("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USD Coin", "USDC", 6, 1.0),
                token("0xdAC17F958D2ee523a2206206994597C13D831ec7", "Tether USD", "USDT", 6, 1.0),
            ],
        },
        ChainTokens {
            chain: ChainKind::Bnb,
            tokens: vec![
                token("0x0000000000000000000000000000000000000000", "BNB", "BNB", 18, 0.01),
                token("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", "USD Coin", "USDC", 18, 1.0),
                token("0x55d398326f99059fF775485246999027B3197955", "Tether USD", "USDT", 18, 1.0),
            ],
        },
    ]
});

/// Read-only lookup of chain configs, tokens and contract deployments
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<ChainKind, ChainConfig>,
    tokens: HashMap<ChainKind, ChainTokens>,
    deployments: HashMap<ChainKind, HashMap<String, Address>>,
}

impl ChainRegistry {
    /// Built-in tables with the well-known token deployments and no betting contract
    pub fn builtin() -> Self {
        let mut deployments: HashMap<ChainKind, HashMap<String, Address>> = HashMap::new();
        deployments.entry(ChainKind::Ethereum).or_default().insert(
            USDC_CONTRACT.to_string(),
            address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        );
        deployments.entry(ChainKind::Bnb).or_default().insert(
            USDC_CONTRACT.to_string(),
            address!("8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
        );

        Self {
            chains: CHAIN_CONFIGS.clone(),
            tokens: CHAIN_TOKENS
                .iter()
                .map(|entry| (entry.chain, entry.clone()))
                .collect(),
            deployments,
        }
    }

    /// Built-in tables with RPC endpoints and betting deployments taken from config
    pub fn from_config(config: &GambaConfig) -> GambaResult<Self> {
        let mut registry = Self::builtin();

        for (chain, settings) in config.chains.iter() {
            if let Some(endpoint) = &settings.rpc_endpoint {
                if let Some(chain_config) = registry.chains.get_mut(&chain) {
                    chain_config.rpc_endpoint = endpoint.clone();
                }
            }

            if let Some(raw) = &settings.betting_contract {
                let parsed = Address::from_str(raw.trim()).map_err(|e| ConfigurationError::InvalidValue {
                    field: format!("chains.{}.betting_contract", chain),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                registry.register(chain, BETTING_CONTRACT, parsed);
            }
        }

        Ok(registry)
    }

    /// Record a deployment; the sentinel address removes it
    pub fn register(&mut self, chain: ChainKind, contract: &str, address: Address) {
        let entries = self.deployments.entry(chain).or_default();
        if is_deployed(address) {
            entries.insert(contract.to_string(), address);
        } else {
            entries.remove(contract);
        }
    }

    /// Deployed address of `contract` on `chain`, or [`SENTINEL_ADDRESS`]
    pub fn resolve(&self, chain: ChainKind, contract: &str) -> Address {
        self.deployments
            .get(&chain)
            .and_then(|entries| entries.get(contract))
            .copied()
            .unwrap_or(SENTINEL_ADDRESS)
    }

    pub fn chain_config(&self, chain: ChainKind) -> Option<&ChainConfig> {
        self.chains.get(&chain)
    }

    pub fn chain_tokens(&self, chain: ChainKind) -> Option<&ChainTokens> {
        self.tokens.get(&chain)
    }

    /// List an extra token on `chain`, replacing one with the same address
    pub fn add_token(&mut self, chain: ChainKind, token: TokenConfig) {
        let entry = self.tokens.entry(chain).or_insert_with(|| ChainTokens {
            chain,
            tokens: Vec::new(),
        });
        entry
            .tokens
            .retain(|t| !t.address.eq_ignore_ascii_case(&token.address));
        entry.tokens.push(token);
    }

    /// Token lookup by address, ignoring hex case
    pub fn token_by_address(&self, chain: ChainKind, address: &str) -> Option<&TokenConfig> {
        self.chain_tokens(chain)?
            .tokens
            .iter()
            .find(|t| t.address.eq_ignore_ascii_case(address))
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// False for the sentinel address
pub fn is_deployed(address: Address) -> bool {
    address != SENTINEL_ADDRESS
}
