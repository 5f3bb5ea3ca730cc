//! Wallet and chain-query seams of the EVM driver
//!
//! The driver only talks to these traits. [`AlloyConnector`] backs them with
//! alloy HTTP providers; tests plug in in-memory implementations.

use crate::chains::ChainConfig;
use crate::errors::{ConfigurationError, TransportError};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Unsigned bet transaction handed to the wallet for signing
#[derive(Debug, Clone, PartialEq)]
pub struct BetTransaction {
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// False when the transaction reverted
    pub succeeded: bool,
    pub logs: Vec<Log>,
}

/// Signing side: accounts, broadcast, confirmation
#[async_trait]
pub trait WalletTransport: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, TransportError>;

    /// Sign and broadcast; returns once the node accepted the transaction
    async fn send_transaction(&self, tx: BetTransaction) -> Result<TxHash, TransportError>;

    /// Wait until the transaction is mined with the configured confirmations
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, TransportError>;
}

/// Read-only contract calls
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, TransportError>;
}

/// Opens transports for a chain on first use
pub trait TransportConnector: Send + Sync {
    fn wallet(&self, chain: &ChainConfig) -> Result<Arc<dyn WalletTransport>, TransportError>;

    fn reader(&self, chain: &ChainConfig) -> Result<Arc<dyn ChainReader>, TransportError>;
}

fn endpoint_url(chain: &ChainConfig) -> Result<Url, TransportError> {
    chain.rpc_endpoint.parse::<Url>().map_err(|e| {
        TransportError::Connection(format!("bad RPC endpoint '{}': {}", chain.rpc_endpoint, e))
    })
}

/// Connector over alloy HTTP providers
///
/// Without a signer only readers can be opened.
#[derive(Clone)]
pub struct AlloyConnector {
    signer: Option<PrivateKeySigner>,
    confirmations: u64,
}

impl AlloyConnector {
    pub fn new(signer: Option<PrivateKeySigner>, confirmations: u64) -> Self {
        Self {
            signer,
            confirmations,
        }
    }

    /// Read-only connector
    pub fn readonly(confirmations: u64) -> Self {
        Self::new(None, confirmations)
    }

    /// Connector signing with a hex private key (with or without `0x`)
    pub fn from_private_key(key: &str, confirmations: u64) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidValue {
            field: "private_key".to_string(),
            value: "<redacted>".to_string(),
            reason,
        };

        let bytes = hex::decode(key.trim().trim_start_matches("0x")).map_err(|e| invalid(e.to_string()))?;
        let signer = PrivateKeySigner::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        info!(account = %signer.address(), "Loaded signing key");

        Ok(Self::new(Some(signer), confirmations))
    }

    pub fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}

impl TransportConnector for AlloyConnector {
    fn wallet(&self, chain: &ChainConfig) -> Result<Arc<dyn WalletTransport>, TransportError> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| TransportError::Connection("no signing key configured".to_string()))?;
        let account = signer.address();
        let url = endpoint_url(chain)?;
        debug!(chain = %chain.kind, %url, %account, "Opening wallet provider");

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Arc::new(AlloyWallet {
            provider,
            account,
            confirmations: self.confirmations,
        }))
    }

    fn reader(&self, chain: &ChainConfig) -> Result<Arc<dyn ChainReader>, TransportError> {
        let url = endpoint_url(chain)?;
        debug!(chain = %chain.kind, %url, "Opening read provider");
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Arc::new(AlloyReader { provider }))
    }
}

/// Wallet backed by a local signer and an HTTP node
pub struct AlloyWallet {
    provider: DynProvider,
    account: Address,
    confirmations: u64,
}

#[async_trait]
impl WalletTransport for AlloyWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, TransportError> {
        Ok(vec![self.account])
    }

    async fn send_transaction(&self, tx: BetTransaction) -> Result<TxHash, TransportError> {
        let request = TransactionRequest::default()
            .with_from(self.account)
            .with_to(tx.to)
            .with_value(tx.value)
            .with_input(tx.input);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, TransportError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| TransportError::Rpc(e.to_string()))?;

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number,
            succeeded: receipt.status(),
            logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
        })
    }
}

/// `eth_call` reader
pub struct AlloyReader {
    provider: DynProvider,
}

#[async_trait]
impl ChainReader for AlloyReader {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, TransportError> {
        let request = TransactionRequest::default().with_to(to).with_input(input);
        self.provider
            .call(request)
            .await
            .map_err(|e| TransportError::Rpc(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{ChainKind, ChainRegistry};

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_private_key_parsing() {
        let with_prefix = AlloyConnector::from_private_key(TEST_KEY, 1).expect("valid key");
        let without_prefix =
            AlloyConnector::from_private_key(TEST_KEY.trim_start_matches("0x"), 1).expect("valid key");
        assert!(with_prefix.account().is_some());
        assert_eq!(with_prefix.account(), without_prefix.account());

        let err = AlloyConnector::from_private_key("not-a-key", 1).err().expect("invalid key");
        assert!(!err.to_string().contains("not-a-key"));
    }

    #[test]
    fn test_readonly_connector_has_no_wallet() {
        let registry = ChainRegistry::builtin();
        let chain = registry.chain_config(ChainKind::Ethereum).expect("ethereum config");
        let connector = AlloyConnector::readonly(1);

        assert!(matches!(connector.wallet(chain), Err(TransportError::Connection(_))));
        assert!(connector.reader(chain).is_ok());
    }

    #[test]
    fn test_bad_endpoint_is_connection_error() {
        let registry = ChainRegistry::builtin();
        let mut chain = registry.chain_config(ChainKind::Bnb).expect("bnb config").clone();
        chain.rpc_endpoint = "not a url".to_string();

        let connector = AlloyConnector::readonly(1);
        assert!(matches!(connector.reader(&chain), Err(TransportError::Connection(_))));
    }
}
