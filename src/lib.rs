//! Gamba - multi-chain betting execution
//!
//! One `play`/`result` interface over on-chain betting on EVM chains and a
//! simulated path for chains without a deployed betting contract. The router
//! in [`factory`] picks the backend for the active chain.

pub mod betting;
pub mod chains;
pub mod config;
pub mod errors;
pub mod evm;
pub mod factory;
pub mod games;

pub use betting::{BettingBackend, BettingSession, BettingState};
pub use chains::{ChainKind, ChainRegistry};
pub use config::{ConfigLoader, GambaConfig};
pub use errors::{BettingError, GambaError, GambaResult, TransportError};
pub use factory::{select_backend, GameHandle, WagerLimits};
pub use games::{BettingResult, PlayOptions, Settlement};
