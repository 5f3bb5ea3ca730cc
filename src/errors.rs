//! Error types for the betting crate
//!
//! `BettingError` is what callers of a betting backend see. `TransportError`
//! describes what went wrong talking to a wallet or an RPC node and is carried
//! as the source of the transaction/result errors. Configuration problems go
//! through the `GambaError` root.

use std::fmt;

/// Failures reported by the wallet or chain-query transports
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Rejected by wallet: {0}")]
    Rejected(String),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Decoding failed: {0}")]
    Decode(String),
}

/// Errors surfaced by `play()` and `result()`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BettingError {
    /// Malformed play options; nothing was sent
    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    /// No wallet adapter, or the wallet exposed no accounts
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// Signing or submission was rejected, or the transaction reverted
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[source] TransportError),

    /// The bet is on-chain but its record could not be read; retry `result()`
    #[error("Failed to fetch bet result: {0}")]
    ResultFetchFailed(#[source] TransportError),

    #[error("No result available - call play() first")]
    NoResult,

    #[error("A bet is already in flight or its result has not been collected")]
    SessionBusy,
}

impl BettingError {
    /// Whether funds may already have moved on-chain when this error was raised
    pub fn funds_committed(&self) -> bool {
        matches!(self, BettingError::ResultFetchFailed(_))
    }
}

/// Root error type for crate setup (configuration, transport construction)
#[derive(Debug)]
pub enum GambaError {
    Configuration(ConfigurationError),
    Betting(BettingError),
    Transport(TransportError),
}

/// Configuration and validation errors
#[derive(Debug)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
}

impl fmt::Display for GambaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GambaError::Configuration(e) => write!(f, "Configuration error: {}", e),
            GambaError::Betting(e) => write!(f, "Betting error: {}", e),
            GambaError::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
        }
    }
}

impl std::error::Error for GambaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GambaError::Configuration(e) => Some(e),
            GambaError::Betting(e) => Some(e),
            GambaError::Transport(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<ConfigurationError> for GambaError {
    fn from(e: ConfigurationError) -> Self {
        GambaError::Configuration(e)
    }
}

impl From<BettingError> for GambaError {
    fn from(e: BettingError) -> Self {
        GambaError::Betting(e)
    }
}

impl From<TransportError> for GambaError {
    fn from(e: TransportError) -> Self {
        GambaError::Transport(e)
    }
}

impl From<toml::de::Error> for GambaError {
    fn from(e: toml::de::Error) -> Self {
        GambaError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<std::io::Error> for GambaError {
    fn from(e: std::io::Error) -> Self {
        GambaError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

pub type GambaResult<T> = Result<T, GambaError>;
