//! Chain router
//!
//! Picks the betting backend for the active chain. Every call builds a fresh
//! backend with its own session; switching chains simply drops the old handle.

use crate::betting::BettingBackend;
use crate::chains::{ChainKind, ChainRegistry};
use crate::config::GambaConfig;
use crate::evm::{EvmBetting, TransportConnector};
use crate::games::simulation::SimulatedBetting;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Wager suggested when the caller has no preference
pub const DEFAULT_WAGER: f64 = 0.01;

/// Accepted wager range for a chain family, in native units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WagerLimits {
    pub min: f64,
    pub max: f64,
}

impl WagerLimits {
    pub const EVM: WagerLimits = WagerLimits { min: 0.001, max: 10.0 };
    pub const SOLANA: WagerLimits = WagerLimits { min: 0.01, max: 100.0 };

    pub fn for_chain(chain: ChainKind) -> Self {
        if chain.is_evm() {
            Self::EVM
        } else {
            Self::SOLANA
        }
    }

    pub fn contains(&self, wager: f64) -> bool {
        wager >= self.min && wager <= self.max
    }

    pub fn clamp(&self, wager: f64) -> f64 {
        wager.clamp(self.min, self.max)
    }
}

/// Backend bound to one chain
#[derive(Clone)]
pub struct GameHandle {
    pub chain: ChainKind,
    pub backend: Arc<dyn BettingBackend>,
    pub limits: WagerLimits,
}

impl std::fmt::Debug for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameHandle")
            .field("chain", &self.chain)
            .field("state", &self.backend.state())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Backend for `chain`: on-chain driver for EVM chains, simulation for Solana
pub fn select_backend(
    chain: ChainKind,
    registry: Arc<ChainRegistry>,
    connector: Option<Arc<dyn TransportConnector>>,
    config: &GambaConfig,
) -> GameHandle {
    let backend: Arc<dyn BettingBackend> = match chain {
        ChainKind::Ethereum | ChainKind::Bnb => Arc::new(EvmBetting::new(
            chain,
            registry,
            connector,
            config.simulation.clone(),
        )),
        ChainKind::Solana => Arc::new(SimulatedBetting::new(chain, config.simulation.clone())),
    };
    info!(%chain, "Selected betting backend");

    GameHandle {
        chain,
        backend,
        limits: WagerLimits::for_chain(chain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::betting::BettingState;
    use crate::games::types::PlayOptions;

    fn handle(chain: ChainKind) -> GameHandle {
        select_backend(
            chain,
            Arc::new(ChainRegistry::builtin()),
            None,
            &GambaConfig::instant(),
        )
    }

    #[test]
    fn test_backend_matches_chain() {
        for chain in ChainKind::ALL {
            let game = handle(chain);
            assert_eq!(game.chain, chain);
            assert_eq!(game.backend.chain(), chain);
            assert_eq!(game.backend.state(), BettingState::Idle);
        }
    }

    #[test]
    fn test_wager_limits() {
        assert_eq!(handle(ChainKind::Ethereum).limits, WagerLimits::EVM);
        assert_eq!(handle(ChainKind::Solana).limits, WagerLimits::SOLANA);

        let evm = WagerLimits::EVM;
        assert!(evm.contains(DEFAULT_WAGER));
        assert!(!evm.contains(11.0));
        assert_eq!(evm.clamp(0.0), 0.001);
        assert_eq!(evm.clamp(50.0), 10.0);
        assert_eq!(WagerLimits::SOLANA.clamp(0.001), 0.01);
    }

    #[tokio::test]
    async fn test_solana_plays_without_wallet() {
        let game = handle(ChainKind::Solana);
        game.backend
            .play(PlayOptions::new(DEFAULT_WAGER, vec![0.0, 2.0]))
            .await
            .expect("simulated play");
        let settlement = game.backend.result().await.expect("result");
        assert_eq!(settlement.result().result_index(), 1);
    }

    #[tokio::test]
    async fn test_evm_without_wallet_is_unavailable() {
        let game = handle(ChainKind::Bnb);
        let err = game
            .backend
            .play(PlayOptions::new(DEFAULT_WAGER, vec![0.0, 2.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::errors::BettingError::WalletUnavailable(_)));
    }

    #[tokio::test]
    async fn test_switching_chains_gives_fresh_session() {
        let first = handle(ChainKind::Solana);
        first
            .backend
            .play(PlayOptions::new(1.0, vec![1.0]))
            .await
            .unwrap();

        let second = handle(ChainKind::Solana);
        assert!(matches!(
            second.backend.result().await,
            Err(crate::errors::BettingError::NoResult)
        ));
    }
}
